//! HTTP client for a dense search service.
//!
//! The service wraps the encoder and the on-disk index built by the indexing
//! job. A request names the index, the query and the number of hits:
//!
//! ```text
//! POST {api_base}/search
//! {"index": "runs/index", "query": "...", "k": 10, "encoder": "castorini/..."}
//!
//! 200 {"hits": [{"docid": "123", "score": 81.2}, ...]}
//! ```
//!
//! `scripts/search_server.py` serves an index written by `create-index` with
//! this contract.

use super::Retriever;
use crate::config::SearchConfig;
use crate::error::{Ms2Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for a search call.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    index: &'a str,
    query: &'a str,
    k: usize,
    encoder: &'a str,
}

/// Response from a search call.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

/// Error body returned by the service on failure.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "crate::corpus::deserialize_id")]
    pub docid: String,
    #[serde(default)]
    pub score: f32,
}

/// Client for the dense search service.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    config: SearchConfig,
    index: String,
}

impl SearchClient {
    /// Create a client that searches `index` with the given configuration.
    pub fn new(config: SearchConfig, index: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            index: index.into(),
        })
    }

    /// Get the search endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/search", base)
    }

    /// Search for the top `k` hits of `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let request = SearchRequest {
            index: &self.index,
            query,
            k,
            encoder: &self.config.encoder,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(Ms2Error::Search(format!(
                    "API error ({}): {}",
                    status, api_error.error
                )));
            }
            return Err(Ms2Error::Search(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| Ms2Error::Search(format!("Invalid search response: {}", e)))?;

        Ok(response.hits)
    }
}

impl Retriever for SearchClient {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let hits = self.search(query, k).await?;
        tracing::debug!(query, k, hits = hits.len(), "search complete");
        Ok(hits.into_iter().map(|hit| hit.docid).collect())
    }
}
