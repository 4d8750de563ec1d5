//! HTTP web intelligence provider
//!
//! Speaks a minimal JSON contract:
//!
//! ```text
//! POST {endpoint}/search   {"query": "...", "max_results": 5}
//! 200 -> {"results": [{"title": "...", "snippet": "...", "url": "...", "published_at": 1700000000}]}
//! ```

use crate::{http_client, status_error, ProviderError, DEFAULT_TIMEOUT_SECS};
use augur_domain::traits::{SearchDocument, SearchQuery, WebSearch};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Web search over an HTTP endpoint
pub struct HttpSearchProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    url: String,
    #[serde(default)]
    published_at: Option<u64>,
}

impl HttpSearchProvider {
    /// Create a provider for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit HTTP timeout
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: http_client(timeout)?,
        })
    }

    /// Send a bearer token with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl WebSearch for HttpSearchProvider {
    type Error = ProviderError;

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchDocument>, Self::Error> {
        let url = format!("{}/search", self.endpoint);
        debug!("Search request: {:?} (max {})", query.text, query.max_results);

        let mut request = self.client.post(&url).json(&SearchRequest {
            query: &query.text,
            max_results: query.max_results,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| ProviderError::Communication(format!("Request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse search response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .take(query.max_results)
            .map(|r| SearchDocument {
                title: r.title,
                snippet: r.snippet,
                url: r.url,
                published_at: r.published_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalized() {
        let provider = HttpSearchProvider::new("http://search.local/").unwrap().with_api_key("k");
        assert_eq!(provider.endpoint, "http://search.local");
        assert_eq!(provider.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_response_contract() {
        let body = r#"{"results": [{"title": "RFP", "snippet": "tender", "url": "https://x/1"}, {"url": "https://x/2"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].snippet, "");
        assert!(parsed.results[0].published_at.is_none());
    }

    #[test]
    fn test_unreachable_endpoint_is_communication_error() {
        let provider = HttpSearchProvider::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let query = SearchQuery {
            text: "acme procurement".to_string(),
            max_results: 3,
        };
        assert!(matches!(provider.search(&query), Err(ProviderError::Communication(_))));
    }
}
