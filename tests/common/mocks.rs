//! Mock implementations for testing.
//!
//! This module provides mock LLM clients and search sources that can be
//! used across different test files without duplication.

use async_trait::async_trait;
use sage::llm::LLMClient;
use sage::tools::Tool;
use sage::types::{AppError, Paper, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock LLM client that routes each prompt to a canned response by
/// inspecting what the prompt asks for.
///
/// This keeps end-to-end tests readable: one mock serves the planning,
/// finding-extraction, synthesis and gap prompts of a full run, and call
/// counters let tests assert which call sites were reached.
pub struct MockLLMClient {
    /// When set, every call fails at the transport level.
    pub fail_all: bool,
    pub planning_calls: AtomicUsize,
    pub finding_calls: AtomicUsize,
    pub synthesis_calls: AtomicUsize,
    pub gap_calls: AtomicUsize,
    pub other_calls: AtomicUsize,
}

impl MockLLMClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_all: false,
            planning_calls: AtomicUsize::new(0),
            finding_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            gap_calls: AtomicUsize::new(0),
            other_calls: AtomicUsize::new(0),
        })
    }

    /// A client whose every call returns a transport error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_all: true,
            planning_calls: AtomicUsize::new(0),
            finding_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            gap_calls: AtomicUsize::new(0),
            other_calls: AtomicUsize::new(0),
        })
    }

    /// Total model calls made after planning.
    pub fn analysis_calls(&self) -> usize {
        self.finding_calls.load(Ordering::SeqCst)
            + self.synthesis_calls.load(Ordering::SeqCst)
            + self.gap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.fail_all {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        if prompt.contains("Create a JSON plan") {
            self.planning_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(r#"{
                "objective": "answer the research query",
                "tasks": [
                    {"id": 1, "kind": "search", "capability": "search_papers", "params": {}},
                    {"id": 2, "kind": "analysis", "capability": "analyze", "params": {}}
                ]
            }"#
            .to_string());
        }

        if prompt.contains("Extract the key finding") {
            self.finding_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("The paper demonstrates a measurable improvement.".to_string());
        }

        if prompt.contains("structured synthesis") {
            self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("Main Themes: efficiency. Key Contributions: scaling laws. \
                       Methodologies: large-scale pretraining."
                .to_string());
        }

        if prompt.contains("research gaps") {
            self.gap_calls.fetch_add(1, Ordering::SeqCst);
            return Ok("1. Long-context efficiency is underexplored\n\
                       2. Evaluation beyond benchmarks is missing"
                .to_string());
        }

        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok("A compact summary of the session so far.".to_string())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Stub search source returning a fixed set of papers, or failing.
pub struct StubSearchSource {
    name: String,
    papers: Vec<Paper>,
    fail: bool,
}

impl StubSearchSource {
    pub fn returning(name: &str, titles: &[&str]) -> Self {
        let papers = titles
            .iter()
            .map(|t| Paper {
                title: t.to_string(),
                authors: vec!["Test Author".to_string()],
                summary: format!("Abstract for {} covering the research query", t),
                year: Some(2025),
                citations: Some(25),
                source: name.to_string(),
                url: format!("https://example.org/{}", t.to_lowercase().replace(' ', "-")),
            })
            .collect();
        Self {
            name: name.to_string(),
            papers,
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            papers: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl Tool for StubSearchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "stub search source for tests"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        if self.fail {
            return Err(AppError::Internal("source unavailable".to_string()));
        }
        Ok(json!({"papers": &self.papers, "count": self.papers.len()}))
    }
}
