//! Inbound signals

use crate::evidence::source_types;

/// Raw signal delivered to the engine's intake
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Subject organization or actor
    pub entity_id: String,
    /// Classification of the opportunity
    pub category: String,
    /// Raw payload text
    pub payload: String,
    /// Source type recorded on the resulting evidence
    pub source_type: String,
    /// Source location, if any
    pub source_url: Option<String>,
    /// When the signal was observed (seconds)
    pub observed_at: u64,
}

impl Signal {
    /// Create a signal with the default `signal` source type
    pub fn new(
        entity_id: impl Into<String>,
        category: impl Into<String>,
        payload: impl Into<String>,
        observed_at: u64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            category: category.into(),
            payload: payload.into(),
            source_type: source_types::SIGNAL.to_string(),
            source_url: None,
            observed_at,
        }
    }

    /// Override the source type
    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    /// Attach a source URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}
