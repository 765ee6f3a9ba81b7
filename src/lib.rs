//! # S.A.G.E. - Scholarly Agent for Gathering Evidence
//!
//! A multi-agent research coordination core: a planner decomposes a
//! research query, concurrent search agents fan out across paper sources,
//! and a sequential analysis pipeline scores, extracts, synthesizes and
//! identifies gaps in what they found.
//!
//! ## Overview
//!
//! S.A.G.E. can be used in two ways:
//!
//! 1. **As a CLI** - Run the `sage` binary with a research query
//! 2. **As a library** - Import components into your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use sage::agents::Orchestrator;
//! use sage::analysis::AnalysisPipeline;
//! use sage::llm::GeminiClient;
//! use sage::memory::{ContextManager, MemoryStore};
//! use sage::search::SearchCoordinator;
//! use sage::tools::{papers::PaperSearchTool, ToolGateway};
//! use sage::types::Query;
//! use sage::utils::config::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!
//!     let mut gateway = ToolGateway::new();
//!     gateway.register(Arc::new(PaperSearchTool::new()));
//!     let gateway = Arc::new(gateway);
//!
//!     let llm = Arc::new(GeminiClient::new(
//!         config.llm.api_key.clone().unwrap_or_default(),
//!         config.llm.base_url.clone(),
//!         config.llm.model.clone(),
//!     ));
//!
//!     let coordinator = SearchCoordinator::new(
//!         gateway.clone(),
//!         config.search.sources.clone(),
//!         config.search.per_source_timeout(),
//!     );
//!     let pipeline = AnalysisPipeline::new(
//!         llm.clone(),
//!         config.analysis.top_k,
//!         config.analysis.synthesis_limit,
//!         config.analysis.max_retries,
//!         config.analysis.stage_timeout(),
//!     );
//!     let context = ContextManager::new(
//!         config.context.compaction_threshold_tokens,
//!         config.context.preserve_recent_turns,
//!     );
//!
//!     let mut orchestrator = Orchestrator::new(
//!         llm,
//!         gateway,
//!         coordinator,
//!         pipeline,
//!         context,
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     let outcome = orchestrator.run(Query::new("transformer efficiency", 10)).await;
//!     println!("{} papers found", outcome.papers.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Orchestrator: planning, plan execution, session state
//! - [`analysis`] - Four-stage sequential analysis pipeline
//! - [`llm`] - Language model client abstraction and Gemini implementation
//! - [`memory`] - Long-term memory store and session context manager
//! - [`search`] - Concurrent multi-source search coordination
//! - [`tools`] - Tool gateway and built-in capabilities
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

/// Orchestrator: planning and plan execution.
pub mod agents;
/// Sequential analysis pipeline (scoring, findings, synthesis, gaps).
pub mod analysis;
/// CLI argument parsing and terminal output.
pub mod cli;
/// Language model clients and abstractions.
pub mod llm;
/// Long-term memory and session context management.
pub mod memory;
/// Concurrent multi-source search coordination.
pub mod search;
/// Tool gateway and built-in capabilities.
pub mod tools;
/// Core types (plans, papers, findings, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{Orchestrator, SessionState};
pub use analysis::{AnalysisOutcome, AnalysisPipeline};
pub use llm::{GeminiClient, LLMClient};
pub use memory::{ContextManager, MemoryStore};
pub use search::{SearchCoordinator, SearchCriteria, SearchOutcome};
pub use tools::ToolGateway;
pub use types::{AppError, Paper, Query, Result, RunOutcome, RunStatus};
pub use utils::config::Config;
