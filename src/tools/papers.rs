//! Scholarly paper search over the Semantic Scholar Graph API.
//!
//! The primary repository source. Unlike the web source, results here
//! carry real publication years and citation counts, so the relevance
//! scorer gets its full signal.

use crate::tools::gateway::Tool;
use crate::types::{AppError, Paper, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Default public endpoint for Semantic Scholar paper search.
pub const DEFAULT_S2_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const S2_FIELDS: &str = "title,abstract,year,citationCount,authors,url";

/// Paper search tool backed by the Semantic Scholar Graph API.
pub struct PaperSearchTool {
    http: reqwest::Client,
    base_url: String,
}

impl Default for PaperSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperSearchTool {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_S2_URL.to_string())
    }

    /// Uses a custom endpoint. Test harnesses point this at a local mock
    /// server.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Tool for PaperSearchTool {
    fn name(&self) -> &str {
        "search_papers"
    }

    fn description(&self) -> &str {
        "Search scholarly paper repositories for published research"
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
            .get(&self.base_url)
            .query(&[
                ("query", query),
                ("limit", &max_results.to_string()),
                ("fields", S2_FIELDS),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Paper search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Paper search returned {}",
                response.status()
            )));
        }

        let body: S2Response = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Paper search decode failed: {}", e)))?;

        let papers: Vec<Paper> = body
            .data
            .into_iter()
            .map(|item| Paper {
                title: item.title,
                authors: item.authors.into_iter().map(|a| a.name).collect(),
                summary: item.r#abstract.unwrap_or_default(),
                year: item.year,
                citations: item.citation_count,
                source: "papers".to_string(),
                url: item.url.unwrap_or_default(),
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
struct S2Response {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(default)]
    title: String,
    #[serde(rename = "abstract")]
    r#abstract: Option<String>,
    year: Option<i32>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    #[serde(default)]
    authors: Vec<S2Author>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    #[serde(default)]
    name: String,
}
