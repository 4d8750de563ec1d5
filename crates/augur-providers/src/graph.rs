//! HTTP knowledge graph provider
//!
//! Read-only contract:
//!
//! ```text
//! GET {endpoint}/entities/{entity_id}?limit=25
//! 200 -> {"entity_id": "...", "attributes": {"sector": "..."}, "relationship_count": 12, "related": ["..."]}
//! 404 -> unknown entity
//! ```

use crate::{http_client, status_error, ProviderError, DEFAULT_TIMEOUT_SECS};
use augur_domain::traits::{EntityProfile, KnowledgeGraph};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Knowledge graph over an HTTP endpoint
pub struct HttpGraphProvider {
    endpoint: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct ProfileResponse {
    entity_id: String,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    relationship_count: usize,
    #[serde(default)]
    related: Vec<String>,
}

impl ProfileResponse {
    fn into_profile(self, limit: usize) -> EntityProfile {
        let attributes = self
            .attributes
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                serde_json::Value::Null => None,
                other => Some((key, other.to_string())),
            })
            .collect();

        EntityProfile {
            entity_id: self.entity_id,
            attributes,
            relationship_count: self.relationship_count.max(self.related.len()),
            related: self.related.into_iter().take(limit).collect(),
        }
    }
}

impl HttpGraphProvider {
    /// Create a provider for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit HTTP timeout
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }
}

impl KnowledgeGraph for HttpGraphProvider {
    type Error = ProviderError;

    fn lookup(&self, entity_id: &str, limit: usize) -> Result<Option<EntityProfile>, Self::Error> {
        let mut url = reqwest::Url::parse(&format!("{}/entities/", self.endpoint))
            .map_err(|e| ProviderError::Unavailable(format!("Invalid graph endpoint: {}", e)))?;
        url = url
            .join(&urlencode(entity_id))
            .map_err(|e| ProviderError::Unavailable(format!("Invalid entity id: {}", e)))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        debug!("Graph lookup: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ProviderError::Communication(format!("Request failed: {}", e)))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: ProfileResponse = response
            .json()
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse graph response: {}", e)))?;
        Ok(Some(parsed.into_profile(limit)))
    }
}

/// Percent-encode an entity id for use as a single path segment
fn urlencode(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}
