//! Evidence tracking
//!
//! An [`Observation`] is a candidate that has not touched any hypothesis yet.
//! Ingesting it (see [`crate::confidence::ingest`]) freezes it into an
//! [`Evidence`] entry carrying the confidence delta it produced.

use crate::id::{EvidenceId, HypothesisId};
use std::fmt;

/// Well-known evidence source types
pub mod source_types {
    /// Raw inbound signal that created or fed a hypothesis
    pub const SIGNAL: &str = "signal";
    /// Relationship-derived evidence from the knowledge graph
    pub const KNOWLEDGE_GRAPH: &str = "knowledge_graph";
    /// Document found by the web intelligence provider
    pub const WEB_SEARCH: &str = "web_search";
}

/// Direction in which evidence pushes a hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Evidence supports the hypothesis (+1)
    Supports,
    /// Evidence is neutral (0)
    Neutral,
    /// Evidence contradicts the hypothesis (-1)
    Contradicts,
}

impl Polarity {
    /// Numeric sign of the polarity
    pub fn sign(&self) -> f64 {
        match self {
            Polarity::Supports => 1.0,
            Polarity::Neutral => 0.0,
            Polarity::Contradicts => -1.0,
        }
    }

    /// Get the polarity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Supports => "supports",
            Polarity::Neutral => "neutral",
            Polarity::Contradicts => "contradicts",
        }
    }

    /// Parse a polarity from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "supports" | "support" | "+1" | "1" => Some(Polarity::Supports),
            "neutral" | "0" => Some(Polarity::Neutral),
            "contradicts" | "contradict" | "-1" => Some(Polarity::Contradicts),
            _ => None,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate observation awaiting ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Source type, e.g. "web_search"
    pub source_type: String,
    /// Bounded human-readable summary of the payload
    pub payload_summary: String,
    /// Where the observation came from, if addressable
    pub source_url: Option<String>,
    /// When the observation was made (seconds)
    pub observed_at: u64,
    /// How well this evidence type discriminates true from false hypotheses [0, 1]
    pub information_value: f64,
    /// Supports, neutral or contradicts
    pub polarity: Polarity,
    /// Short rationale from the reasoning provider
    pub rationale: Option<String>,
}

impl Observation {
    /// Create a new observation
    pub fn new(
        source_type: impl Into<String>,
        payload_summary: impl Into<String>,
        observed_at: u64,
        information_value: f64,
        polarity: Polarity,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            payload_summary: payload_summary.into(),
            source_url: None,
            observed_at,
            information_value,
            polarity,
            rationale: None,
        }
    }

    /// Attach a source URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Attach a rationale
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Immutable observation tied to a hypothesis
///
/// Evidence is append-only: it is never updated or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    /// Unique identifier
    pub id: EvidenceId,
    /// Hypothesis this evidence contributed to
    pub hypothesis_id: HypothesisId,
    /// Source type, e.g. "web_search"
    pub source_type: String,
    /// Bounded human-readable summary of the payload
    pub payload_summary: String,
    /// Where the observation came from, if addressable
    pub source_url: Option<String>,
    /// When the observation was made (seconds)
    pub observed_at: u64,
    /// Discriminative value of the evidence type [0, 1]
    pub information_value: f64,
    /// Supports, neutral or contradicts
    pub polarity: Polarity,
    /// Confidence change produced at ingestion (kept for audit and impact analysis)
    pub confidence_delta: f64,
    /// Pass that produced the evidence (0 for inbound signals)
    pub pass_number: u32,
    /// Short rationale from the reasoning provider
    pub rationale: Option<String>,
}
