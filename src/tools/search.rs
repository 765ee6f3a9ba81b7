//! Web search capability over a Serper-style JSON search API.
//!
//! This is one concrete provider behind the gateway's search contract:
//! a search capability accepts `{query, max_results}` and returns
//! `{papers: [...], count}` where each entry matches [`Paper`]. The
//! scholarly repository source ([`crate::tools::papers`]) sits behind the
//! same contract.

use crate::tools::gateway::Tool;
use crate::types::{AppError, Paper, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Default public endpoint for the Serper search API.
pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";

/// Web search tool backed by the Serper API.
pub struct WebSearchTool {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WebSearchTool {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_SERPER_URL.to_string())
    }

    /// Uses a custom endpoint. Test harnesses point this at a local mock
    /// server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for papers and articles"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)",
                    "default": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidParameters("Missing 'query' parameter".to_string()))?;

        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(10);

        let response = self
            .http
            .post(&self.base_url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({"q": query, "num": max_results}))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Web search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Web search returned {}",
                response.status()
            )));
        }

        let body: SerperResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Web search decode failed: {}", e)))?;

        let papers: Vec<Paper> = body
            .organic
            .into_iter()
            .map(|item| {
                let year = extract_year(&format!("{} {}", item.title, item.snippet));
                Paper {
                    title: item.title,
                    authors: vec![],
                    summary: item.snippet,
                    year,
                    citations: None,
                    source: "web".to_string(),
                    url: item.link,
                }
            })
            .collect();

        let count = papers.len();
        Ok(json!({
            "query": query,
            "papers": papers,
            "count": count
        }))
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Extracts a plausible publication year (20xx) from free text.
fn extract_year(text: &str) -> Option<i32> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 4 <= bytes.len() {
        let boundary_before = i == 0 || !bytes[i - 1].is_ascii_digit();
        let boundary_after = i + 4 == bytes.len() || !bytes[i + 4].is_ascii_digit();
        if boundary_before
            && boundary_after
            && bytes[i] == b'2'
            && bytes[i + 1] == b'0'
            && bytes[i + 2].is_ascii_digit()
            && bytes[i + 3].is_ascii_digit()
        {
            let year: i32 = text[i..i + 4].parse().ok()?;
            return Some(year);
        }
        i += 1;
    }
    None
}
