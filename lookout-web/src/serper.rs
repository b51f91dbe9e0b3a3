//! Serper (Google Search) client.
//!
//! One POST per query with the raw query string; only the `organic` hits are
//! consumed and only their `title` and `link`.
use anyhow::Context;
use lookout_common::{LookoutError, Result, SearchResult};
use lookout_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const SERPER_SEARCH_ENDPOINT: &str = "https://google.serper.dev/search";
/// How many organic hits a search keeps by default.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// A web search backend returning hits in provider ranking order.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct SerperApi {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

impl SerperApi {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Self::with_endpoint(SERPER_SEARCH_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: &str, api_key: String) -> anyhow::Result<Self> {
        let http = HttpClient::new(endpoint)
            .with_context(|| format!("invalid search endpoint: {endpoint}"))?;
        if api_key.trim().is_empty() {
            tracing::warn!(target: "web.serper", "Serper API key is empty; searches will be rejected");
        }
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key,
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerperApi {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let query_snippet: String = query.chars().take(160).collect();
        let started = Instant::now();
        tracing::info!(target: "web.serper", query = %query_snippet, "search.serper.start");

        let auth = Auth::header("x-api-key", &self.api_key)
            .map_err(|e| LookoutError::Search(e.to_string()))?;
        let resp: SerperResponse = match self
            .http
            .post_json_opts(
                &self.endpoint,
                &SerperRequest { q: query },
                RequestOpts {
                    auth: Some(auth),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(
                    target: "web.serper",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "search.serper.error"
                );
                return Err(LookoutError::Search(e.to_string()));
            }
        };

        let total = resp.organic.len();
        let mut hits = resp.organic;
        hits.truncate(self.max_results);

        tracing::info!(
            target: "web.serper",
            query = %query_snippet,
            organic = total,
            kept = hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search.serper.success"
        );
        Ok(hits)
    }
}
