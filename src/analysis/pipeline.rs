//! The four-stage sequential analysis state machine.

use crate::analysis::scoring::{rank_papers, ScoredPaper};
use crate::llm::LLMClient;
use crate::types::{Finding, Paper, RelevanceScore, SynthesisReport};
use std::sync::Arc;
use std::time::Duration;

/// Length budget for a finding, shared by the model path and the
/// truncated-abstract fallback.
const FINDING_LENGTH_BUDGET: usize = 300;

/// Guard against runaway model output masquerading as a finding.
const FINDING_MAX_CHARS: usize = 1200;

/// Minimum body length for a structurally valid synthesis.
const SYNTHESIS_MIN_CHARS: usize = 40;

const BACKOFF_BASE_MS: u64 = 250;
const BACKOFF_CAP_MS: u64 = 1000;

/// Why a run stopped early.
#[derive(Debug, Clone)]
pub struct StageFailureInfo {
    pub stage: &'static str,
    pub reason: String,
}

/// Output of one pipeline run. Later-stage fields stay empty when an
/// earlier stage failed; whatever was produced before the failure is
/// retained.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// Stage-1 scores in descending rank order.
    pub scores: Vec<RelevanceScore>,
    pub findings: Vec<Finding>,
    pub synthesis: Option<SynthesisReport>,
    pub gaps: Vec<String>,
    pub failure: Option<StageFailureInfo>,
}

/// Result of one model call site after validation, retries and timeout
/// handling.
enum ModelCall {
    /// Structurally valid content.
    Valid(String),
    /// Timed out, or still malformed after the retry budget; the call
    /// site substitutes its deterministic fallback.
    Fallback(String),
    /// Transport errors exhausted the retry budget; the stage has no
    /// usable content and must abort the run.
    Fatal(String),
}

/// Four-stage sequential pipeline. Stages never overlap and never run
/// concurrently within one run; suspension points exist only at model
/// call boundaries.
pub struct AnalysisPipeline {
    llm: Arc<dyn LLMClient>,
    top_k: usize,
    synthesis_limit: usize,
    max_retries: u32,
    stage_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        top_k: usize,
        synthesis_limit: usize,
        max_retries: u32,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            top_k,
            synthesis_limit,
            max_retries,
            stage_timeout,
        }
    }

    /// Runs stages 1→2→3→4 over the aggregated papers.
    pub async fn run(&self, papers: Vec<Paper>, query: &str) -> AnalysisOutcome {
        let mut outcome = AnalysisOutcome::default();

        // Stage 1: relevance evaluation. Scores are computed once per run
        // and never revisited by later stages.
        let ranked = rank_papers(papers, query);
        outcome.scores = ranked.iter().map(|s| s.score.clone()).collect();
        tracing::info!(papers = ranked.len(), "stage 1 complete");

        // Stage 2: finding extraction over the top-K scored papers.
        let top: Vec<&ScoredPaper> = ranked.iter().take(self.top_k).collect();
        for scored in &top {
            let paper = &scored.paper;
            let prompt = format!(
                "Extract the key finding from this paper in 1-2 sentences:\n\n\
                 Title: {}\nSummary: {}\n\nKey finding:",
                paper.title,
                truncate_chars(&paper.summary, 500)
            );

            match self.call_model(&prompt, validate_finding).await {
                ModelCall::Valid(text) => outcome.findings.push(Finding {
                    paper_id: paper.id(),
                    text: text.trim().to_string(),
                }),
                ModelCall::Fallback(reason) => {
                    tracing::warn!(paper = %paper.title, reason, "finding fallback to abstract");
                    outcome.findings.push(Finding {
                        paper_id: paper.id(),
                        text: truncate_chars(&paper.summary, FINDING_LENGTH_BUDGET),
                    });
                }
                ModelCall::Fatal(reason) => {
                    outcome.failure = Some(StageFailureInfo {
                        stage: "finding_extraction",
                        reason,
                    });
                    return outcome;
                }
            }
        }
        tracing::info!(findings = outcome.findings.len(), "stage 2 complete");

        // Stage 3: synthesis over the top findings.
        let contributing: Vec<&Finding> = outcome
            .findings
            .iter()
            .take(self.synthesis_limit)
            .collect();
        let paper_ids: Vec<String> = contributing.iter().map(|f| f.paper_id.clone()).collect();
        let findings_block = contributing
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. [{}] {}", i + 1, f.paper_id, f.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Analyze these research findings and provide insights.\n\n\
             Research Query: {}\n\nFindings:\n{}\n\n\
             Provide a structured synthesis covering:\n\
             1. Main Themes: What are the common themes?\n\
             2. Key Contributions: What are the major findings?\n\
             3. Methodologies: What approaches are used?\n\n\
             Be concise but insightful (300-400 words).",
            query, findings_block
        );

        let body = match self.call_model(&prompt, validate_synthesis).await {
            ModelCall::Valid(text) => text.trim().to_string(),
            ModelCall::Fallback(reason) => {
                tracing::warn!(reason, "synthesis fallback");
                "Synthesis unavailable.".to_string()
            }
            ModelCall::Fatal(reason) => {
                outcome.failure = Some(StageFailureInfo {
                    stage: "synthesis",
                    reason,
                });
                return outcome;
            }
        };
        outcome.synthesis = Some(SynthesisReport { body, paper_ids });
        tracing::info!("stage 3 complete");

        // Stage 4: gap identification over synthesis and findings.
        let synthesis_body = outcome
            .synthesis
            .as_ref()
            .map(|s| s.body.clone())
            .unwrap_or_default();
        let prompt = format!(
            "Based on this synthesis of research on \"{}\":\n\n{}\n\n\
             And these findings:\n{}\n\n\
             Identify 3-4 research gaps that need more investigation.\n\
             List one gap per line, numbered.",
            query, synthesis_body, findings_block
        );

        match self.call_model(&prompt, |text| !parse_gaps(text).is_empty()).await {
            ModelCall::Valid(text) => outcome.gaps = parse_gaps(&text),
            ModelCall::Fallback(reason) => {
                tracing::warn!(reason, "gap identification fallback, returning no gaps");
            }
            ModelCall::Fatal(reason) => {
                outcome.failure = Some(StageFailureInfo {
                    stage: "gap_identification",
                    reason,
                });
                return outcome;
            }
        }
        tracing::info!(gaps = outcome.gaps.len(), "stage 4 complete");

        outcome
    }

    /// One model call site: independent timeout, bounded re-prompts with
    /// exponential backoff, structural validation.
    ///
    /// A timeout falls back immediately rather than blocking the stage on
    /// further attempts. Malformed content is re-prompted up to the retry
    /// budget, then falls back. Transport errors are retried the same way
    /// but exhaust into [`ModelCall::Fatal`].
    async fn call_model<F>(&self, prompt: &str, validate: F) -> ModelCall
    where
        F: Fn(&str) -> bool,
    {
        let mut last_transport_error: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = (BACKOFF_BASE_MS << (attempt - 1)).min(BACKOFF_CAP_MS);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match tokio::time::timeout(self.stage_timeout, self.llm.generate(prompt)).await {
                Err(_) => {
                    return ModelCall::Fallback(format!(
                        "model call timed out after {:?}",
                        self.stage_timeout
                    ))
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt, error = %e, "model call failed");
                    last_transport_error = Some(e.to_string());
                }
                Ok(Ok(text)) => {
                    if validate(&text) {
                        return ModelCall::Valid(text);
                    }
                    tracing::warn!(attempt, "model response failed structural validation");
                    last_transport_error = None;
                }
            }
        }

        match last_transport_error {
            Some(reason) => ModelCall::Fatal(reason),
            None => ModelCall::Fallback("response malformed after retries".to_string()),
        }
    }
}

fn validate_finding(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.len() <= FINDING_MAX_CHARS
}

fn validate_synthesis(text: &str) -> bool {
    text.trim().len() >= SYNTHESIS_MIN_CHARS
}

/// Parses an ordered gap list: lines that look like list items, markers
/// stripped, capped at five.
fn parse_gaps(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with(|c: char| c.is_ascii_digit()) || line.starts_with(['-', '*'])
        })
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c.is_ascii_digit() || c == '.' || c == ')' || c == '-' || c == '*' || c == ' '
            })
            .to_string()
        })
        .filter(|gap| !gap.is_empty())
        .take(5)
        .collect()
}

/// Char-safe truncation.
fn truncate_chars(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}
