//! Search client trait and Google Custom Search implementation
//!
//! The search backend degrades instead of failing: missing credentials or a
//! per-query HTTP error produce empty result structures so the content
//! pipeline never breaks on research problems.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Results for one search query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub items: Vec<serde_json::Value>,
    pub related_questions: Vec<String>,
    pub related_searches: Vec<String>,
}

impl SearchResults {
    /// An empty result set for a query (used on every degradation path)
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Search backend abstraction
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run each query and return one result set per query, in order.
    ///
    /// Never fails: auth or transport problems yield empty result sets.
    async fn search(&self, queries: &[String]) -> Vec<SearchResults>;
}

/// Google Custom Search API base URL
const CSE_API_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search client
pub struct GoogleSearchClient {
    client: Client,
    api_key: Option<String>,
    cse_id: Option<String>,
    country: String,
    language: String,
}

impl GoogleSearchClient {
    /// Create a client; None credentials are allowed and degrade every
    /// search to empty results.
    pub fn new(
        api_key: Option<String>,
        cse_id: Option<String>,
        country: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            cse_id,
            country: country.into(),
            language: language.into(),
        }
    }

    async fn search_one(&self, query: &str, api_key: &str, cse_id: &str) -> SearchResults {
        let response = self
            .client
            .get(CSE_API_URL)
            .query(&[
                ("key", api_key),
                ("cx", cse_id),
                ("q", query),
                ("gl", self.country.as_str()),
                ("lr", self.language.as_str()),
            ])
            .send()
            .await;

        let body: serde_json::Value = match response {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(body) => body,
                Err(e) => {
                    log::error!("Search API returned unparseable body for '{}': {}", query, e);
                    return SearchResults::empty(query);
                }
            },
            Ok(r) => {
                log::error!("Search API error for '{}': {}", query, r.status());
                return SearchResults::empty(query);
            }
            Err(e) => {
                log::error!("Search request failed for '{}': {}", query, e);
                return SearchResults::empty(query);
            }
        };

        Self::parse_results(query, &body)
    }

    /// Pull items and related-search labels out of a CSE response body.
    ///
    /// The API does not expose "people also ask" reliably; related-search
    /// facets double as the question source.
    fn parse_results(query: &str, body: &serde_json::Value) -> SearchResults {
        let items = body
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut related_searches = Vec::new();
        if let Some(facets) = body["context"]["facets"].as_array() {
            for facet in facets {
                if let Some(buckets) = facet.get("buckets").and_then(|b| b.as_array()) {
                    for bucket in buckets {
                        if let Some(label) = bucket.get("label").and_then(|l| l.as_str()) {
                            related_searches.push(label.to_string());
                        }
                    }
                }
            }
        }

        SearchResults {
            query: query.to_string(),
            items,
            related_questions: related_searches.clone(),
            related_searches,
        }
    }
}

#[async_trait]
impl SearchClient for GoogleSearchClient {
    async fn search(&self, queries: &[String]) -> Vec<SearchResults> {
        let (api_key, cse_id) = match (&self.api_key, &self.cse_id) {
            (Some(key), Some(id)) => (key.clone(), id.clone()),
            _ => {
                log::error!("Google API key or CSE ID not configured");
                return queries.iter().map(|q| SearchResults::empty(q.as_str())).collect();
            }
        };

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.search_one(query, &api_key, &cse_id).await);
        }
        results
    }
}
