//! Four-stage sequential analysis pipeline.
//!
//! Aggregated papers flow through four strictly ordered stages:
//!
//! 1. Relevance evaluation - deterministic scoring, no external call
//! 2. Finding extraction - one model call per top-K paper
//! 3. Research synthesis - one model call over the top findings
//! 4. Gap identification - one model call over synthesis and findings
//!
//! Each stage consumes the full output of the prior stage; a stage failure
//! aborts the remaining stages for that run and surfaces a partial result.

/// Stages 1-4 as a sequential state machine.
pub mod pipeline;
/// Stage 1 relevance scoring.
pub mod scoring;

pub use pipeline::{AnalysisOutcome, AnalysisPipeline, StageFailureInfo};
pub use scoring::{rank_papers, score_paper, ScoredPaper};
