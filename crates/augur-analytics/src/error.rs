//! Error types for population analytics

use thiserror::Error;

/// Errors that can occur while building reports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),
}

impl AnalyticsError {
    pub(crate) fn store(err: impl std::fmt::Display) -> Self {
        AnalyticsError::Store(err.to_string())
    }
}
