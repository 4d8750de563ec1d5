//! Augur Collaborator Providers
//!
//! Implementations of the collaborator traits from `augur-domain`.
//!
//! # Providers
//!
//! - `OllamaProvider`: local Ollama API integration ([`LlmProvider`])
//! - `HttpSearchProvider`: JSON search endpoint ([`WebSearch`])
//! - `HttpGraphProvider`: JSON knowledge graph endpoint ([`KnowledgeGraph`])
//! - `MockProvider`, `MockSearch`, `MockGraph`: deterministic doubles for testing
//!
//! Every error type converts into [`CollaboratorError`], which is how the
//! engine decides between retrying, discarding and degrading.
//!
//! # Examples
//!
//! ```
//! use augur_providers::MockProvider;
//! use augur_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```
//!
//! [`LlmProvider`]: augur_domain::traits::LlmProvider
//! [`WebSearch`]: augur_domain::traits::WebSearch
//! [`KnowledgeGraph`]: augur_domain::traits::KnowledgeGraph

#![warn(missing_docs)]

pub mod graph;
pub mod mock;
pub mod ollama;
pub mod search;

use augur_domain::traits::CollaboratorError;
use std::time::Duration;
use thiserror::Error;

pub use graph::HttpGraphProvider;
pub use mock::{MockGraph, MockProvider, MockSearch};
pub use ollama::OllamaProvider;
pub use search::HttpSearchProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Communication(_) | LlmError::RateLimitExceeded => CollaboratorError::Transient(err.to_string()),
            LlmError::InvalidResponse(_) => CollaboratorError::Malformed(err.to_string()),
            LlmError::ModelNotAvailable(_) | LlmError::Other(_) => CollaboratorError::Unavailable(err.to_string()),
        }
    }
}

/// Errors that can occur when calling search or graph endpoints
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response body did not match the expected contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Endpoint misconfigured or refusing requests
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for CollaboratorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Communication(_) | ProviderError::RateLimitExceeded => {
                CollaboratorError::Transient(err.to_string())
            }
            ProviderError::InvalidResponse(_) => CollaboratorError::Malformed(err.to_string()),
            ProviderError::Unavailable(_) => CollaboratorError::Unavailable(err.to_string()),
        }
    }
}

/// Default timeout for HTTP requests (30 seconds)
///
/// The engine enforces its own, usually tighter, per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, ProviderError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Unavailable(format!("Failed to build HTTP client: {}", e)))
}

/// Classify a non-success HTTP status
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimitExceeded
    } else if status.is_server_error() || status == reqwest::StatusCode::REQUEST_TIMEOUT {
        ProviderError::Communication(format!("HTTP {}: {}", status, body))
    } else {
        ProviderError::Unavailable(format!("HTTP {}: {}", status, body))
    }
}
