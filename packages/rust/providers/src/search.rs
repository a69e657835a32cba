//! Web-search service client.
//!
//! A Tavily-style JSON search API behind the [`SearchProvider`] trait.
//! Per-query failures are surfaced as errors; the callers (researchers)
//! decide how to isolate them.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use companyscout_shared::{Category, Result, ScoutError};

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// How thoroughly the service should search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// Topic hint narrowing the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTopic {
    General,
    News,
    Finance,
}

/// Parameters for one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub depth: SearchDepth,
    pub max_results: usize,
    pub topic: Option<SearchTopic>,
    pub include_raw_content: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            depth: SearchDepth::Basic,
            max_results: 5,
            topic: None,
            include_raw_content: false,
        }
    }
}

impl SearchParams {
    /// Parameters for a category's research track. News and financial
    /// researchers get a topic hint; everything else searches generally.
    pub fn for_category(category: Category) -> Self {
        let topic = match category {
            Category::News => Some(SearchTopic::News),
            Category::Financial => Some(SearchTopic::Finance),
            Category::Industry | Category::Company => None,
        };
        Self {
            topic,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// Lenient score field: a JSON number or a numeric string parses, anything
/// else becomes `None` and is dropped later by the curation threshold.
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// One item from a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

// ---------------------------------------------------------------------------
// SearchProvider
// ---------------------------------------------------------------------------

/// Boundary to the external search service.
pub trait SearchProvider: Send + Sync + 'static {
    fn search(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> impl Future<Output = Result<Vec<SearchResult>>> + Send;
}

// ---------------------------------------------------------------------------
// Tavily-style client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: SearchDepth,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<SearchTopic>,
    include_raw_content: bool,
}

/// Client for a Tavily-compatible search endpoint.
pub struct TavilyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TavilyClient {
    /// Build a client. A missing API key is a fatal configuration error.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ScoutError::config("search service API key is empty"));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ScoutError::search(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchResult>> {
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: params.depth,
            max_results: params.max_results,
            topic: params.topic,
            include_raw_content: params.include_raw_content,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoutError::search(format!("'{query}': {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::search(format!("'{query}': HTTP {status}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::search(format!("'{query}': invalid response: {e}")))?;

        debug!(query, results = parsed.results.len(), "search complete");
        Ok(parsed.results)
    }
}
