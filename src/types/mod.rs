//! Shared types and error handling for the research coordination core.
//!
//! Everything that crosses a module boundary lives here: the research data
//! model (queries, plans, papers, scores, findings), the tool invocation
//! envelope, memory records, and the crate-wide [`AppError`] taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============= Query & Plan Types =============

/// A research query. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Free-text research question.
    pub text: String,
    /// Upper bound on results requested per source.
    pub max_results: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, max_results: usize) -> Self {
        Self {
            text: text.into(),
            max_results,
        }
    }
}

/// Execution mode declared per task group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Parallel,
    Sequential,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// Closed set of task kinds. Each variant is bound to one executor at
/// plan-construction time; there is no runtime dispatch by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Search,
    Analysis,
}

/// One unit of work in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub kind: TaskKind,
    /// Target capability name, resolved through the tool gateway.
    pub capability: String,
    pub params: serde_json::Value,
    pub mode: ExecutionMode,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Creates a pending task. Execution mode is fixed by kind, not
    /// inferred: search tasks fan out in parallel, analysis runs
    /// sequentially.
    pub fn new(
        id: u32,
        kind: TaskKind,
        capability: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        let mode = match kind {
            TaskKind::Search => ExecutionMode::Parallel,
            TaskKind::Analysis => ExecutionMode::Sequential,
        };
        Self {
            id,
            kind,
            capability: capability.into(),
            params,
            mode,
            status: TaskStatus::Pending,
            error: None,
        }
    }
}

/// An ordered research plan produced by the orchestrator. Read-only after
/// construction apart from appended task status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub objective: String,
    pub tasks: Vec<Task>,
    pub execution_mode: ExecutionMode,
}

// ============= Tool Invocation Types =============

/// Outcome of a single capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationOutcome {
    Ok,
    Error,
}

/// Record of one capability call through the tool gateway. Appended to the
/// execution history on completion and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: Uuid,
    pub capability: String,
    pub params: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: InvocationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocation {
    /// Whether the call reached its handler and returned a payload.
    pub fn is_ok(&self) -> bool {
        self.outcome == InvocationOutcome::Ok
    }
}

/// Declarative description of a registered capability, suitable for
/// inclusion in a planning prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// ============= Search Result Types =============

/// A paper (or paper-like web result) returned by one search source.
/// Immutable after aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<u64>,
    /// Source tag, e.g. "arxiv" or "web".
    pub source: String,
    pub url: String,
}

impl Paper {
    /// Stable identifier: the normalized title. Doubles as the
    /// deduplication key during aggregation, so score and finding
    /// references stay consistent across a run.
    pub fn id(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Lowercases and collapses a title to alphanumeric words joined by single
/// spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One search source's failure, recorded without aborting its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

// ============= Analysis Types =============

/// Relevance score for one paper, produced in pipeline stage 1 and never
/// recomputed afterwards within the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub paper_id: String,
    /// Combined score in [0, 1].
    pub score: f32,
    pub title_match: f32,
    pub abstract_match: f32,
    pub recency: f32,
    pub citation: f32,
}

/// A one-to-two-sentence claim extracted from a scored paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub paper_id: String,
    pub text: String,
}

/// Free-text synthesis plus the papers it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub body: String,
    pub paper_ids: Vec<String>,
}

// ============= Memory & Session Types =============

/// Importance attached to a long-term memory record. High-importance
/// records are persisted verbatim, outside the compacted session buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Medium,
    High,
}

/// A long-term memory entry with last-write-wins upsert semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub importance: Importance,
    pub timestamp: DateTime<Utc>,
}

/// Role of a session-buffer turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    /// Produced by compaction; replaces a summarized window of older turns.
    Summary,
}

/// One entry in the rolling session context buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============= Run Outcome Types =============

/// Terminal status of one research run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// All stages produced output (possibly via deterministic fallbacks).
    Complete,
    /// Search succeeded but returned zero papers; analysis was skipped.
    /// A normal terminal condition, not an error.
    NoResults,
    /// Every configured search source failed.
    AllSourcesFailed,
    /// An analysis stage exhausted its retries with no usable fallback;
    /// later stages were aborted but partial results are retained.
    StageFailure { stage: String, reason: String },
}

/// The well-formed result object every run returns, carrying whichever of
/// papers, findings, synthesis and gaps it managed to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub query: String,
    pub status: RunStatus,
    pub papers: Vec<Paper>,
    pub scores: Vec<RelevanceScore>,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisReport>,
    pub gaps: Vec<String>,
    pub errors: Vec<SourceError>,
    pub duration_ms: u64,
}

// ============= Error Types =============

/// Crate-wide error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Capability name not present in the gateway registry. Never retried.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// Required parameter keys missing or malformed. Never retried.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Transport-level failure talking to the language model.
    #[error("LLM error: {0}")]
    LLM(String),

    /// Model returned structurally invalid content. Triggers bounded
    /// retry then a deterministic fallback; never propagates past its
    /// stage.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Every configured search source failed or timed out.
    #[error("all search sources failed")]
    AllSourcesFailed,

    /// Summarization call failed; the context buffer is left untouched.
    #[error("Compaction failed: {0}")]
    CompactionFailed(String),

    /// An analysis stage exhausted its retries with no usable fallback.
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: &'static str, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
