//! Search coordinator: concurrent fan-out over configured sources.

use crate::tools::ToolGateway;
use crate::types::{normalize_title, Paper, Query, SourceError};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Per-source observability for one search call.
#[derive(Debug, Clone)]
pub struct SourceStats {
    pub source: String,
    pub latency_ms: u64,
    pub result_count: usize,
}

/// Aggregated result of one fan-out.
///
/// At-least-one-success policy: the search is considered successful when
/// at least one source returned at least one paper; only the all-failed
/// case is a run-level failure.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Deduplicated papers in source-priority order.
    pub papers: Vec<Paper>,
    pub errors: Vec<SourceError>,
    pub stats: Vec<SourceStats>,
    /// Number of sources dispatched.
    pub sources_attempted: usize,
}

impl SearchOutcome {
    pub fn all_sources_failed(&self) -> bool {
        self.sources_attempted > 0 && self.errors.len() == self.sources_attempted
    }
}

/// Cumulative statistics across searches.
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    pub total_searches: usize,
    pub total_results: usize,
    pub recent_queries: Vec<String>,
}

/// Criteria for an advanced multi-field search.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub keywords: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub max_results: usize,
}

/// Fans a query out to N source capabilities concurrently, one gateway
/// invocation per source with an independent timeout, and merges the
/// completed results.
pub struct SearchCoordinator {
    gateway: Arc<ToolGateway>,
    /// Source capability names in priority order; the first is the primary
    /// repository.
    sources: Vec<String>,
    per_source_timeout: Duration,
    statistics: Mutex<SearchStatistics>,
}

impl SearchCoordinator {
    pub fn new(gateway: Arc<ToolGateway>, sources: Vec<String>, per_source_timeout: Duration) -> Self {
        Self {
            gateway,
            sources,
            per_source_timeout,
            statistics: Mutex::new(SearchStatistics::default()),
        }
    }

    /// Executes the fan-out and blocks until every source completed or
    /// timed out.
    ///
    /// A source that errors or times out becomes a [`SourceError`] and
    /// never aborts its siblings; a timed-out source is not retried within
    /// the same run. Output ordering is deterministic: results are merged
    /// in configured source-priority order, then deduplicated by
    /// normalized title.
    pub async fn search(&self, query: &Query) -> SearchOutcome {
        let mut set = JoinSet::new();

        for (priority, source) in self.sources.iter().cloned().enumerate() {
            let gateway = self.gateway.clone();
            let params = json!({
                "query": query.text,
                "max_results": query.max_results
            });
            let timeout = self.per_source_timeout;

            set.spawn(async move {
                let clock = Instant::now();
                // The deadline lives inside the gateway call, so a timed-out
                // invocation is still appended to the execution history.
                let invocation = gateway.invoke_with_deadline(&source, params, timeout).await;
                let outcome = match invocation.payload {
                    Some(payload) => {
                        serde_json::from_value::<Vec<Paper>>(payload["papers"].clone())
                            .map_err(|e| format!("malformed search payload: {}", e))
                    }
                    None => Err(invocation
                        .error
                        .unwrap_or_else(|| "no payload returned".to_string())),
                };
                (priority, source, clock.elapsed(), outcome)
            });
        }

        // Completion order is a race; slots restore priority order.
        let mut slots: Vec<Option<(String, Duration, Result<Vec<Paper>, String>)>> =
            (0..self.sources.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((priority, source, latency, outcome)) => {
                    slots[priority] = Some((source, latency, outcome));
                }
                Err(e) => tracing::error!(error = %e, "search task failed to join"),
            }
        }

        let mut papers = Vec::new();
        let mut errors = Vec::new();
        let mut stats = Vec::new();
        let mut seen_titles: HashSet<String> = HashSet::new();

        for (priority, slot) in slots.into_iter().enumerate() {
            // A missing slot means the task panicked before reporting; it
            // still counts as a failed source.
            let Some((source, latency, outcome)) = slot else {
                let source = self.sources[priority].clone();
                stats.push(SourceStats {
                    source: source.clone(),
                    latency_ms: 0,
                    result_count: 0,
                });
                errors.push(SourceError {
                    source,
                    message: "search task panicked".to_string(),
                });
                continue;
            };
            match outcome {
                Ok(source_papers) => {
                    let mut kept = 0;
                    for paper in source_papers {
                        if seen_titles.insert(normalize_title(&paper.title)) {
                            papers.push(paper);
                            kept += 1;
                        }
                    }
                    tracing::info!(
                        source,
                        latency_ms = latency.as_millis() as u64,
                        results = kept,
                        "source completed"
                    );
                    stats.push(SourceStats {
                        source,
                        latency_ms: latency.as_millis() as u64,
                        result_count: kept,
                    });
                }
                Err(message) => {
                    tracing::warn!(source, error = %message, "source failed");
                    stats.push(SourceStats {
                        source: source.clone(),
                        latency_ms: latency.as_millis() as u64,
                        result_count: 0,
                    });
                    errors.push(SourceError { source, message });
                }
            }
        }

        {
            let mut statistics = self.statistics.lock();
            statistics.total_searches += 1;
            statistics.total_results += papers.len();
            statistics.recent_queries.push(query.text.clone());
            if statistics.recent_queries.len() > 5 {
                statistics.recent_queries.remove(0);
            }
        }

        SearchOutcome {
            papers,
            errors,
            stats,
            sources_attempted: self.sources.len(),
        }
    }

    /// Advanced search: keywords joined into one query, results filtered
    /// by publication year bounds. Papers without a year fail a
    /// `year_min` bound and pass a `year_max` bound.
    pub async fn search_by_criteria(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let max_results = if criteria.max_results == 0 {
            10
        } else {
            criteria.max_results
        };
        let query = Query::new(criteria.keywords.join(" "), max_results);
        let mut outcome = self.search(&query).await;

        if criteria.year_min.is_some() || criteria.year_max.is_some() {
            outcome.papers.retain(|paper| {
                let year = paper.year.unwrap_or(0);
                criteria.year_min.map_or(true, |min| year >= min)
                    && criteria.year_max.map_or(true, |max| year <= max)
            });
        }

        outcome
    }

    /// Finds papers related to a given one by searching on its title. The
    /// seed paper itself is excluded from the results.
    pub async fn search_related(&self, paper_title: &str, max_results: usize) -> SearchOutcome {
        let seed = normalize_title(paper_title);
        let mut outcome = self.search(&Query::new(paper_title, max_results)).await;
        outcome.papers.retain(|paper| normalize_title(&paper.title) != seed);
        outcome
    }

    /// Snapshot of cumulative search statistics.
    pub fn statistics(&self) -> SearchStatistics {
        self.statistics.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::gateway::Tool;
    use crate::types::{AppError, Result as SageResult};
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubSource {
        name: String,
        papers: Vec<Paper>,
        fail: bool,
        delay: Duration,
    }

    impl StubSource {
        fn returning(name: &str, titles: &[&str]) -> Self {
            let papers = titles
                .iter()
                .map(|t| Paper {
                    title: t.to_string(),
                    authors: vec![],
                    summary: format!("summary of {}", t),
                    year: Some(2024),
                    citations: None,
                    source: name.to_string(),
                    url: format!("https://example.org/{}", normalize_title(t)),
                })
                .collect();
            Self {
                name: name.to_string(),
                papers,
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                name: name.to_string(),
                papers: vec![],
                fail: true,
                delay: Duration::ZERO,
            }
        }

        fn slow(name: &str, delay: Duration) -> Self {
            let mut stub = Self::returning(name, &["slow paper"]);
            stub.delay = delay;
            stub
        }
    }

    #[async_trait]
    impl Tool for StubSource {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "stub search source"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "required": ["query"]})
        }
        async fn execute(&self, _args: Value) -> SageResult<Value> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AppError::Internal("provider unavailable".to_string()));
            }
            Ok(json!({"papers": &self.papers, "count": self.papers.len()}))
        }
    }

    fn coordinator(tools: Vec<StubSource>, timeout: Duration) -> SearchCoordinator {
        let mut gateway = ToolGateway::new();
        let sources: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
        for tool in tools {
            gateway.register(Arc::new(tool));
        }
        SearchCoordinator::new(Arc::new(gateway), sources, timeout)
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_sources() {
        let coordinator = coordinator(
            vec![
                StubSource::returning("a", &["P1", "P2"]),
                StubSource::failing("b"),
                StubSource::returning("c", &["P3"]),
            ],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.papers.len(), 3);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source, "b");
        assert!(!outcome.all_sources_failed());
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let coordinator = coordinator(
            vec![
                StubSource::failing("a"),
                StubSource::failing("b"),
                StubSource::failing("c"),
            ],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert!(outcome.papers.is_empty());
        assert_eq!(outcome.errors.len(), 3);
        assert!(outcome.all_sources_failed());
    }

    #[tokio::test]
    async fn test_dedup_by_normalized_title() {
        let coordinator = coordinator(
            vec![
                StubSource::returning("primary", &["Attention Is All You Need"]),
                StubSource::returning("secondary", &["attention is all you need!"]),
            ],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.papers.len(), 1);
        // Priority order: the primary source's copy wins.
        assert_eq!(outcome.papers[0].source, "primary");
    }

    #[tokio::test]
    async fn test_ordering_is_source_priority_not_completion() {
        // Primary is slower than secondary, but must still come first.
        let coordinator = coordinator(
            vec![
                StubSource::slow("primary", Duration::from_millis(50)),
                StubSource::returning("secondary", &["fast paper"]),
            ],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.papers.len(), 2);
        assert_eq!(outcome.papers[0].source, "primary");
        assert_eq!(outcome.papers[1].source, "secondary");
    }

    #[tokio::test]
    async fn test_timeout_becomes_source_error() {
        let coordinator = coordinator(
            vec![
                StubSource::slow("stuck", Duration::from_secs(5)),
                StubSource::returning("ok", &["P1"]),
            ],
            Duration::from_millis(20),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source, "stuck");
        assert!(outcome.errors[0].message.contains("timed out"));
    }

    struct PanickingSource {
        name: String,
    }

    #[async_trait]
    impl Tool for PanickingSource {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "stub source that panics"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "required": ["query"]})
        }
        async fn execute(&self, _args: Value) -> SageResult<Value> {
            panic!("source crashed");
        }
    }

    #[tokio::test]
    async fn test_timed_out_source_still_in_invocation_history() {
        let mut gateway = ToolGateway::new();
        gateway.register(Arc::new(StubSource::slow("stuck", Duration::from_secs(5))));
        let gateway = Arc::new(gateway);
        let coordinator = SearchCoordinator::new(
            gateway.clone(),
            vec!["stuck".to_string()],
            Duration::from_millis(20),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.errors.len(), 1);

        // The timed-out call is observable in history, not silently dropped.
        let history = gateway.history(&crate::tools::HistoryFilter::default());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].capability, "stuck");
        assert_eq!(
            history[0].outcome,
            crate::types::InvocationOutcome::Error
        );
        assert!(history[0].error.as_deref().unwrap_or("").contains("timed out"));
    }

    #[tokio::test]
    async fn test_panicking_source_counts_as_failed() {
        let mut gateway = ToolGateway::new();
        gateway.register(Arc::new(PanickingSource {
            name: "boom".to_string(),
        }));
        gateway.register(Arc::new(StubSource::returning("ok", &["P1"])));
        let coordinator = SearchCoordinator::new(
            Arc::new(gateway),
            vec!["boom".to_string(), "ok".to_string()],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source, "boom");
        assert_eq!(outcome.stats.len(), 2);
        assert!(!outcome.all_sources_failed());
    }

    #[tokio::test]
    async fn test_all_panicking_sources_is_all_failed() {
        let mut gateway = ToolGateway::new();
        gateway.register(Arc::new(PanickingSource {
            name: "boom".to_string(),
        }));
        let coordinator = SearchCoordinator::new(
            Arc::new(gateway),
            vec!["boom".to_string()],
            Duration::from_secs(5),
        );

        let outcome = coordinator.search(&Query::new("q", 10)).await;
        assert!(outcome.all_sources_failed());
    }

    #[tokio::test]
    async fn test_search_by_criteria_filters_by_year() {
        let old = Paper {
            title: "Old Result".to_string(),
            authors: vec![],
            summary: String::new(),
            year: Some(2015),
            citations: None,
            source: "a".to_string(),
            url: String::new(),
        };
        let mut recent = old.clone();
        recent.title = "Recent Result".to_string();
        recent.year = Some(2024);
        let mut undated = old.clone();
        undated.title = "Undated Result".to_string();
        undated.year = None;

        let mut gateway = ToolGateway::new();
        let mut stub = StubSource::returning("a", &[]);
        stub.papers = vec![old, recent, undated];
        gateway.register(Arc::new(stub));
        let coordinator = SearchCoordinator::new(
            Arc::new(gateway),
            vec!["a".to_string()],
            Duration::from_secs(5),
        );

        let outcome = coordinator
            .search_by_criteria(&SearchCriteria {
                keywords: vec!["transformer".to_string(), "models".to_string()],
                year_min: Some(2020),
                year_max: None,
                max_results: 10,
            })
            .await;

        // Year bound drops the old paper and the undated one.
        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.papers[0].title, "Recent Result");
    }

    #[tokio::test]
    async fn test_search_related_excludes_seed_paper() {
        let coordinator = coordinator(
            vec![StubSource::returning(
                "a",
                &["Attention Is All You Need", "BERT Pretraining"],
            )],
            Duration::from_secs(5),
        );

        let outcome = coordinator
            .search_related("Attention Is All You Need!", 5)
            .await;

        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.papers[0].title, "BERT Pretraining");
    }

    #[tokio::test]
    async fn test_statistics_accumulate() {
        let coordinator = coordinator(
            vec![StubSource::returning("a", &["P1", "P2"])],
            Duration::from_secs(5),
        );

        coordinator.search(&Query::new("first", 10)).await;
        coordinator.search(&Query::new("second", 10)).await;

        let stats = coordinator.statistics();
        assert_eq!(stats.total_searches, 2);
        assert_eq!(stats.total_results, 4);
        assert_eq!(stats.recent_queries, vec!["first", "second"]);
    }
}
