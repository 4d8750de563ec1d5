//! Error types for engine operations

use augur_domain::traits::CollaboratorError;
use augur_domain::TransitionError;
use thiserror::Error;

/// Errors that can occur during engine operations
///
/// Collaborator failures and lost compare-and-set races are absorbed inside
/// a cycle; they surface only from single-shot operations such as
/// [`crate::Engine::ingest_signal`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Timeout or rate limit from a collaborator, retries exhausted
    #[error("Transient collaborator error: {0}")]
    TransientCollaborator(String),

    /// Collaborator response could not be turned into evidence
    #[error("Malformed evidence: {0}")]
    MalformedEvidence(String),

    /// Lost a compare-and-set race twice
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Another cycle holds the orchestrator lease
    #[error("Cycle already running (held by {holder} until {expires_at})")]
    CapacityExceeded {
        /// Owner token of the running cycle
        holder: String,
        /// When the lease expires (seconds)
        expires_at: u64,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signal rejected at intake
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// No hypothesis with this id
    #[error("Hypothesis not found: {0}")]
    HypothesisNotFound(String),

    /// The hypothesis already has an outcome
    #[error("Outcome already recorded for hypothesis {0}")]
    OutcomeAlreadyRecorded(String),

    /// Effectiveness score outside [0, 1]
    #[error("Invalid effectiveness score: {0}")]
    InvalidScore(f64),

    /// Invalid episode at intake
    #[error("Invalid episode: {0}")]
    InvalidEpisode(String),

    /// Illegal status transition
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl EngineError {
    /// Wrap a store error
    pub(crate) fn store(err: impl std::fmt::Display) -> Self {
        EngineError::Store(err.to_string())
    }
}

impl From<TransitionError> for EngineError {
    fn from(err: TransitionError) -> Self {
        EngineError::InvalidTransition(err.to_string())
    }
}

impl From<CollaboratorError> for EngineError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Transient(msg) => EngineError::TransientCollaborator(msg),
            CollaboratorError::Malformed(msg) => EngineError::MalformedEvidence(msg),
            CollaboratorError::Unavailable(msg) => EngineError::TransientCollaborator(format!("unavailable: {}", msg)),
        }
    }
}
