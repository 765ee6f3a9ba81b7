//! End-to-end tests for the research coordination core: planning, search
//! fan-out, the analysis pipeline and session bookkeeping wired together
//! with mock sources and a mock model.

mod common;

use common::mocks::{MockLLMClient, StubSearchSource};
use sage::agents::Orchestrator;
use sage::analysis::AnalysisPipeline;
use sage::memory::{ContextManager, MemoryStore};
use sage::search::SearchCoordinator;
use sage::tools::memory::{MemoryRecallTool, MemoryStoreTool};
use sage::tools::{HistoryFilter, Tool, ToolGateway};
use sage::types::{Importance, InvocationOutcome, Query, RunStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    llm: Arc<MockLLMClient>,
    gateway: Arc<ToolGateway>,
    memory: Arc<MemoryStore>,
    orchestrator: Orchestrator,
}

fn harness(llm: Arc<MockLLMClient>, sources: Vec<StubSearchSource>) -> Harness {
    let memory = Arc::new(MemoryStore::new());

    let mut gateway = ToolGateway::new();
    let source_names: Vec<String> = sources.iter().map(|s| s.name().to_string()).collect();
    for source in sources {
        gateway.register(Arc::new(source));
    }
    gateway.register(Arc::new(MemoryStoreTool::new(memory.clone())));
    gateway.register(Arc::new(MemoryRecallTool::new(memory.clone())));
    let gateway = Arc::new(gateway);

    let coordinator =
        SearchCoordinator::new(gateway.clone(), source_names, Duration::from_secs(5));
    let pipeline = AnalysisPipeline::new(llm.clone(), 10, 5, 2, Duration::from_secs(5));
    let context = ContextManager::new(2000, 4);

    let orchestrator = Orchestrator::new(
        llm.clone(),
        gateway.clone(),
        coordinator,
        pipeline,
        context,
        memory.clone(),
    );

    Harness {
        llm,
        gateway,
        memory,
        orchestrator,
    }
}

fn titles(prefix: &str) -> Vec<String> {
    (1..=5).map(|i| format!("{} Paper {}", prefix, i)).collect()
}

#[tokio::test]
async fn test_full_run_across_three_sources() {
    let alpha = titles("Alpha");
    let beta = titles("Beta");
    let gamma = titles("Gamma");
    let mut h = harness(
        MockLLMClient::new(),
        vec![
            StubSearchSource::returning("search_papers", &to_refs(&alpha)),
            StubSearchSource::returning("search_web", &to_refs(&beta)),
            StubSearchSource::returning("search_archive", &to_refs(&gamma)),
        ],
    );

    let outcome = h
        .orchestrator
        .run(Query::new("transformer efficiency", 10))
        .await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.papers.len(), 15);
    assert!(outcome.errors.is_empty());

    // Stage 1 scores everything, stage 2 is capped at top-K.
    assert_eq!(outcome.scores.len(), 15);
    assert_eq!(outcome.findings.len(), 10);

    let finding_ids: HashSet<&str> = outcome.findings.iter().map(|f| f.paper_id.as_str()).collect();
    let synthesis = outcome.synthesis.as_ref().expect("synthesis produced");
    assert!(synthesis.paper_ids.len() <= 5);
    for id in &synthesis.paper_ids {
        assert!(finding_ids.contains(id.as_str()));
    }

    assert!(!outcome.gaps.is_empty());
    assert_eq!(h.llm.planning_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_sources_failed_skips_analysis() {
    let mut h = harness(
        MockLLMClient::new(),
        vec![
            StubSearchSource::failing("search_papers"),
            StubSearchSource::failing("search_web"),
            StubSearchSource::failing("search_archive"),
        ],
    );

    let outcome = h.orchestrator.run(Query::new("anything", 10)).await;

    assert_eq!(outcome.status, RunStatus::AllSourcesFailed);
    assert!(outcome.papers.is_empty());
    assert_eq!(outcome.errors.len(), 3);
    assert!(outcome.findings.is_empty());
    assert!(outcome.synthesis.is_none());
    // The pipeline was never invoked.
    assert_eq!(h.llm.analysis_calls(), 0);
}

#[tokio::test]
async fn test_empty_results_is_no_results_not_error() {
    let mut h = harness(
        MockLLMClient::new(),
        vec![StubSearchSource::returning("search_papers", &[])],
    );

    let outcome = h.orchestrator.run(Query::new("obscure topic", 10)).await;

    assert_eq!(outcome.status, RunStatus::NoResults);
    assert!(outcome.errors.is_empty());
    assert_eq!(h.llm.analysis_calls(), 0);
}

#[tokio::test]
async fn test_partial_source_failure_still_completes() {
    let alpha = titles("Alpha");
    let mut h = harness(
        MockLLMClient::new(),
        vec![
            StubSearchSource::returning("search_papers", &to_refs(&alpha)),
            StubSearchSource::failing("search_web"),
        ],
    );

    let outcome = h.orchestrator.run(Query::new("transformers", 10)).await;

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.papers.len(), 5);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].source, "search_web");
}

#[tokio::test]
async fn test_duplicate_titles_deduplicated_with_priority() {
    let mut h = harness(
        MockLLMClient::new(),
        vec![
            StubSearchSource::returning("search_papers", &["Shared Result", "Primary Only"]),
            StubSearchSource::returning("search_web", &["shared result!", "Web Only"]),
        ],
    );

    let outcome = h.orchestrator.run(Query::new("shared", 10)).await;

    assert_eq!(outcome.papers.len(), 3);
    let shared = outcome
        .papers
        .iter()
        .find(|p| p.id() == "shared result")
        .expect("shared paper kept");
    // The higher-priority source's copy wins.
    assert_eq!(shared.source, "search_papers");
}

#[tokio::test]
async fn test_run_summary_persisted_through_gateway() {
    let alpha = titles("Alpha");
    let mut h = harness(
        MockLLMClient::new(),
        vec![StubSearchSource::returning("search_papers", &to_refs(&alpha))],
    );

    h.orchestrator.run(Query::new("memory check", 10)).await;

    // The write went through the gateway and landed in its history.
    let writes = h.gateway.history(&HistoryFilter {
        capability: Some("memory_store".to_string()),
        outcome: Some(InvocationOutcome::Ok),
    });
    assert_eq!(writes.len(), 1);

    let record = h
        .memory
        .recall("run:memory_check")
        .expect("run summary stored");
    assert_eq!(record.importance, Importance::High);
    assert_eq!(record.value["papers_found"], 5);
}

#[tokio::test]
async fn test_planning_failure_degrades_to_search_only_run() {
    let alpha = titles("Alpha");
    let mut h = harness(
        MockLLMClient::failing(),
        vec![StubSearchSource::returning("search_papers", &to_refs(&alpha))],
    );

    let outcome = h.orchestrator.run(Query::new("degraded run", 10)).await;

    // Fallback plan carries no analysis task: papers come back, the
    // pipeline never runs, and the run still completes.
    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.papers.len(), 5);
    assert!(outcome.findings.is_empty());
    assert!(outcome.synthesis.is_none());
}

#[tokio::test]
async fn test_session_reset_keeps_long_term_memory() {
    let alpha = titles("Alpha");
    let mut h = harness(
        MockLLMClient::new(),
        vec![StubSearchSource::returning("search_papers", &to_refs(&alpha))],
    );

    h.orchestrator.run(Query::new("first query", 10)).await;
    assert_eq!(h.orchestrator.session_state().task_history.len(), 1);
    assert!(!h.orchestrator.context().is_empty());

    h.orchestrator.reset_session();

    assert!(h.orchestrator.session_state().task_history.is_empty());
    assert!(h.orchestrator.session_state().current_task.is_none());
    assert!(h.orchestrator.context().is_empty());
    // Long-term memory survives the session.
    assert!(h.memory.recall("run:first_query").is_some());
}

fn to_refs(titles: &[String]) -> Vec<&str> {
    titles.iter().map(String::as_str).collect()
}
