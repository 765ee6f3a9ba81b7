//! Rolling session context buffer with threshold-triggered compaction.

use crate::llm::LLMClient;
use crate::types::{AppError, Result, Turn, TurnRole};
use std::collections::VecDeque;

/// Estimates token count for a piece of text (~4 chars per token for
/// English; an approximation that may vary by tokenizer).
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Session context buffer. The tracked size is maintained incrementally on
/// append and recomputed after compaction.
pub struct ContextManager {
    threshold_tokens: usize,
    preserve_recent: usize,
    turns: VecDeque<Turn>,
    tracked_tokens: usize,
}

impl ContextManager {
    pub fn new(threshold_tokens: usize, preserve_recent: usize) -> Self {
        Self {
            threshold_tokens,
            preserve_recent,
            turns: VecDeque::new(),
            tracked_tokens: 0,
        }
    }

    /// Appends a turn to the buffer.
    pub fn append(&mut self, turn: Turn) {
        self.tracked_tokens += estimate_tokens(&turn.content);
        self.turns.push_back(turn);
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Tracked approximate size in token-equivalents.
    pub fn tracked_tokens(&self) -> usize {
        self.tracked_tokens
    }

    pub fn needs_compaction(&self) -> bool {
        self.tracked_tokens > self.threshold_tokens
    }

    /// Clears the buffer (session termination).
    pub fn reset(&mut self) {
        self.turns.clear();
        self.tracked_tokens = 0;
    }

    /// Compacts the buffer if the tracked size exceeds the threshold.
    ///
    /// The most recent `preserve_recent` turns are kept verbatim; the
    /// older window is replaced by one LLM summary turn. Returns `false`
    /// without doing any work when already below threshold or when there
    /// is nothing older than the preserved window. On a failed or empty
    /// summarization the buffer is left untouched and
    /// [`AppError::CompactionFailed`] is returned; no data is lost.
    pub async fn compact_if_needed(&mut self, llm: &dyn LLMClient) -> Result<bool> {
        if !self.needs_compaction() {
            return Ok(false);
        }
        if self.turns.len() <= self.preserve_recent {
            return Ok(false);
        }

        let split = self.turns.len() - self.preserve_recent;
        let window: Vec<String> = self
            .turns
            .iter()
            .take(split)
            .map(|t| format!("{:?}: {}", t.role, t.content))
            .collect();

        let prompt = format!(
            "Summarize this research context concisely (under {} tokens):\n\n{}\n\n\
             Focus on: key findings, important papers, research direction.\n\
             Return a brief summary.",
            self.threshold_tokens / 2,
            window.join("\n")
        );

        let summary = llm
            .generate(&prompt)
            .await
            .map_err(|e| AppError::CompactionFailed(e.to_string()))?;

        if summary.trim().is_empty() {
            return Err(AppError::CompactionFailed(
                "summarization returned empty content".to_string(),
            ));
        }

        let recent: Vec<Turn> = self.turns.iter().skip(split).cloned().collect();
        let before = self.tracked_tokens;

        self.turns.clear();
        self.turns
            .push_back(Turn::new(TurnRole::Summary, summary.trim().to_string()));
        self.turns.extend(recent);
        self.tracked_tokens = self
            .turns
            .iter()
            .map(|t| estimate_tokens(&t.content))
            .sum();

        tracing::info!(
            tokens_before = before,
            tokens_after = self.tracked_tokens,
            preserved = self.preserve_recent,
            "session context compacted"
        );
        Ok(true)
    }
}
