//! Orchestrator: plans research tasks and drives their execution.

use crate::analysis::AnalysisPipeline;
use crate::llm::LLMClient;
use crate::memory::{ContextManager, MemoryStore};
use crate::search::SearchCoordinator;
use crate::tools::ToolGateway;
use crate::types::{
    ExecutionMode, Plan, Query, RunOutcome, RunStatus, Task, TaskKind, TaskStatus, Turn, TurnRole,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// One completed planning round, kept in the append-only task history.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub query: String,
    pub plan: Plan,
    pub timestamp: DateTime<Utc>,
}

/// Per-session state, owned exclusively by the orchestrator and reset
/// only by explicit session termination.
#[derive(Debug, Default)]
pub struct SessionState {
    pub current_task: Option<String>,
    pub task_history: Vec<TaskRecord>,
    pub active_agents: Vec<String>,
}

/// Top-level planner and executor for research runs.
///
/// Single-writer discipline: only the orchestrator mutates session state
/// and the context buffer. The search coordinator and analysis pipeline
/// return values instead of touching shared state.
pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    gateway: Arc<ToolGateway>,
    coordinator: SearchCoordinator,
    pipeline: AnalysisPipeline,
    context: ContextManager,
    memory: Arc<MemoryStore>,
    session: SessionState,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        gateway: Arc<ToolGateway>,
        coordinator: SearchCoordinator,
        pipeline: AnalysisPipeline,
        context: ContextManager,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            llm,
            gateway,
            coordinator,
            pipeline,
            context,
            memory,
            session: SessionState::default(),
        }
    }

    /// Plans and executes one research run end to end.
    pub async fn run(&mut self, query: Query) -> RunOutcome {
        let plan = self.plan_research_task(&query).await;
        self.execute_plan(plan, &query).await
    }

    /// Decomposes the query into one parallel search task group and one
    /// sequential analysis task group.
    ///
    /// The model proposes the plan; an unparsable response substitutes the
    /// deterministic fallback (a single parallel search task, no
    /// analysis), so planning always yields some plan.
    pub async fn plan_research_task(&mut self, query: &Query) -> Plan {
        let capabilities = self
            .gateway
            .definitions()
            .iter()
            .map(|d| format!("- {}: {}", d.name, d.description))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"You are a research orchestrator. Analyze this query and create an execution plan.

User Query: {}

Available capabilities:
{}

Create a JSON plan:
{{
  "objective": "clear research goal",
  "tasks": [
    {{"id": 1, "kind": "search", "capability": "search_papers", "params": {{"query": "...", "max_results": {}}}}},
    {{"id": 2, "kind": "analysis", "capability": "analyze", "params": {{}}}}
  ]
}}

Return ONLY valid JSON:"#,
            query.text, capabilities, query.max_results
        );

        let plan = match self.llm.generate(&prompt).await {
            Ok(response) => parse_plan(&response, query),
            Err(e) => {
                tracing::warn!(error = %e, "planning call failed, using fallback plan");
                None
            }
        };

        let plan = plan.unwrap_or_else(|| fallback_plan(query));

        self.session.current_task = Some(plan.objective.clone());
        self.session.task_history.push(TaskRecord {
            query: query.text.clone(),
            plan: plan.clone(),
            timestamp: Utc::now(),
        });

        plan
    }

    /// Executes the plan: the parallel search group first, then — only if
    /// it produced papers — the sequential analysis group.
    pub async fn execute_plan(&mut self, mut plan: Plan, query: &Query) -> RunOutcome {
        let clock = Instant::now();

        for task in plan.tasks.iter_mut().filter(|t| t.kind == TaskKind::Search) {
            task.status = TaskStatus::Running;
        }
        self.session.active_agents.clear();
        self.session
            .active_agents
            .push("SearchCoordinator".to_string());

        let search = self.coordinator.search(query).await;
        for task in plan.tasks.iter_mut().filter(|t| t.kind == TaskKind::Search) {
            task.status = if search.all_sources_failed() {
                task.error = Some("all sources failed".to_string());
                TaskStatus::Failed
            } else {
                TaskStatus::Done
            };
        }

        let wants_analysis = plan.tasks.iter().any(|t| t.kind == TaskKind::Analysis);

        let mut outcome = RunOutcome {
            query: query.text.clone(),
            status: RunStatus::Complete,
            papers: search.papers,
            scores: vec![],
            findings: vec![],
            synthesis: None,
            gaps: vec![],
            errors: search.errors,
            duration_ms: 0,
        };

        if search.sources_attempted > 0 && outcome.errors.len() == search.sources_attempted {
            outcome.status = RunStatus::AllSourcesFailed;
        } else if outcome.papers.is_empty() {
            // Zero papers from healthy sources is a normal terminal
            // condition; analysis is skipped, not failed.
            outcome.status = RunStatus::NoResults;
        } else if wants_analysis {
            for task in plan.tasks.iter_mut().filter(|t| t.kind == TaskKind::Analysis) {
                task.status = TaskStatus::Running;
            }
            self.session
                .active_agents
                .push("AnalysisPipeline".to_string());

            let analysis = self
                .pipeline
                .run(outcome.papers.clone(), &query.text)
                .await;

            outcome.scores = analysis.scores;
            outcome.findings = analysis.findings;
            outcome.synthesis = analysis.synthesis;
            outcome.gaps = analysis.gaps;

            let failed = analysis.failure.is_some();
            if let Some(failure) = analysis.failure {
                outcome.status = RunStatus::StageFailure {
                    stage: failure.stage.to_string(),
                    reason: failure.reason,
                };
            }
            for task in plan.tasks.iter_mut().filter(|t| t.kind == TaskKind::Analysis) {
                task.status = if failed { TaskStatus::Failed } else { TaskStatus::Done };
            }
        }

        outcome.duration_ms = clock.elapsed().as_millis() as u64;

        // Keep the recorded plan in sync with final task statuses.
        if let Some(record) = self.session.task_history.last_mut() {
            if record.query == query.text {
                record.plan = plan;
            }
        }

        self.record_run(&outcome).await;
        outcome
    }

    /// Persists a high-importance summary of the run, appends the turn to
    /// the session buffer and compacts it if needed. All failures here are
    /// absorbed: observability must not degrade availability.
    async fn record_run(&mut self, outcome: &RunOutcome) {
        let summary = json!({
            "query": outcome.query,
            "status": outcome.status,
            "papers_found": outcome.papers.len(),
            "findings": outcome.findings.len(),
            "gaps": outcome.gaps.len(),
        });

        // Through the gateway, so the write shows up in invocation history.
        let invocation = self
            .gateway
            .invoke(
                "memory_store",
                json!({
                    "key": format!("run:{}", normalize_key(&outcome.query)),
                    "value": summary,
                    "importance": "high"
                }),
            )
            .await;
        if !invocation.is_ok() {
            tracing::warn!(
                error = invocation.error.as_deref().unwrap_or(""),
                "failed to persist run summary"
            );
        }

        self.context
            .append(Turn::new(TurnRole::User, outcome.query.clone()));
        self.context.append(Turn::new(
            TurnRole::Assistant,
            format!(
                "Found {} papers, extracted {} findings, identified {} gaps.",
                outcome.papers.len(),
                outcome.findings.len(),
                outcome.gaps.len()
            ),
        ));

        match self.context.compact_if_needed(self.llm.as_ref()).await {
            Ok(true) => tracing::info!("session context compacted after run"),
            Ok(false) => {}
            // Fail-safe: the buffer is left uncompacted, nothing is lost.
            Err(e) => tracing::warn!(error = %e, "context compaction failed"),
        }
    }

    pub fn session_state(&self) -> &SessionState {
        &self.session
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn search_coordinator(&self) -> &SearchCoordinator {
        &self.coordinator
    }

    /// Terminates the session: clears session state and the context
    /// buffer, keeping long-term memory.
    pub fn reset_session(&mut self) {
        self.session = SessionState::default();
        self.context.reset();
    }
}

/// Deterministic fallback plan: a single parallel search task, no
/// analysis.
fn fallback_plan(query: &Query) -> Plan {
    Plan {
        objective: query.text.clone(),
        tasks: vec![Task::new(
            1,
            TaskKind::Search,
            "search",
            json!({"query": query.text, "max_results": query.max_results}),
        )],
        execution_mode: ExecutionMode::Sequential,
    }
}

#[derive(Debug, Deserialize)]
struct PlanDraft {
    objective: String,
    tasks: Vec<TaskDraft>,
}

#[derive(Debug, Deserialize)]
struct TaskDraft {
    id: u32,
    kind: TaskKind,
    #[serde(default)]
    capability: String,
    #[serde(default)]
    params: serde_json::Value,
}

/// Parses a model-proposed plan, tolerating code fences and surrounding
/// prose. Returns `None` for anything structurally unusable.
fn parse_plan(response: &str, query: &Query) -> Option<Plan> {
    let body = extract_json_object(response)?;
    let draft: PlanDraft = serde_json::from_str(body).ok()?;

    if draft.tasks.is_empty() || !draft.tasks.iter().any(|t| t.kind == TaskKind::Search) {
        return None;
    }

    let tasks = draft
        .tasks
        .into_iter()
        .map(|t| {
            let params = if t.params.is_object() {
                t.params
            } else {
                json!({"query": query.text, "max_results": query.max_results})
            };
            Task::new(t.id, t.kind, t.capability, params)
        })
        .collect();

    Some(Plan {
        objective: draft.objective,
        tasks,
        execution_mode: ExecutionMode::Sequential,
    })
}

/// Extracts the outermost JSON object from model output, stripping
/// markdown code fences when present.
fn extract_json_object(text: &str) -> Option<&str> {
    let inner = if let Some(start) = text.find("```json") {
        let after = &text[start + 7..];
        after.split("```").next().unwrap_or(after)
    } else if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        after.split("```").next().unwrap_or(after)
    } else {
        text
    };

    let start = inner.find('{')?;
    let end = inner.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&inner[start..=end])
}

fn normalize_key(text: &str) -> String {
    crate::types::normalize_title(text).replace(' ', "_")
}
