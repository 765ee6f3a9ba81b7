//! Configuration for the research coordination core.
//!
//! All values are read once at startup and passed into component
//! constructors explicitly; no component reads ambient global state.

use crate::types::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub analysis: AnalysisConfig,
    pub context: ContextConfig,
    pub memory: MemoryConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Source capability names in priority order; the first entry is the
    /// primary repository and wins ordering ties during aggregation.
    pub sources: Vec<String>,
    pub per_source_timeout_secs: u64,
    pub max_results: usize,
}

impl SearchConfig {
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_secs(self.per_source_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Papers carried into finding extraction (stage 2).
    pub top_k: usize,
    /// Findings carried into synthesis (stage 3).
    pub synthesis_limit: usize,
    /// Re-prompt attempts after the first call at each model call site.
    pub max_retries: u32,
    pub stage_timeout_secs: u64,
}

impl AnalysisConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Token-equivalent threshold above which the session buffer is
    /// compacted.
    pub compaction_threshold_tokens: usize,
    /// Most recent turns preserved verbatim during compaction.
    pub preserve_recent_turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// JSON snapshot path for long-term memory; in-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LLMConfig {
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            search: SearchConfig {
                sources: vec!["search_papers".to_string(), "search_web".to_string()],
                per_source_timeout_secs: 20,
                max_results: 10,
            },
            analysis: AnalysisConfig {
                top_k: 10,
                synthesis_limit: 5,
                max_retries: 2,
                stage_timeout_secs: 30,
            },
            context: ContextConfig {
                compaction_threshold_tokens: 2000,
                preserve_recent_turns: 4,
            },
            memory: MemoryConfig { path: None },
            report: ReportConfig {
                output_dir: PathBuf::from("data/outputs"),
            },
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    /// for anything unset. `.env` files are honored via dotenvy.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Config {
            llm: LLMConfig {
                api_key: env::var("GOOGLE_API_KEY").ok(),
                model: env::var("SAGE_MODEL").unwrap_or(defaults.llm.model),
                base_url: env::var("SAGE_LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
            },
            search: SearchConfig {
                sources: match env::var("SAGE_SOURCES") {
                    Ok(s) => s
                        .split(',')
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect(),
                    Err(_) => defaults.search.sources,
                },
                per_source_timeout_secs: parse_env(
                    "SAGE_SOURCE_TIMEOUT_SECS",
                    defaults.search.per_source_timeout_secs,
                )?,
                max_results: parse_env("SAGE_MAX_RESULTS", defaults.search.max_results)?,
            },
            analysis: AnalysisConfig {
                top_k: parse_env("SAGE_TOP_K", defaults.analysis.top_k)?,
                synthesis_limit: parse_env(
                    "SAGE_SYNTHESIS_LIMIT",
                    defaults.analysis.synthesis_limit,
                )?,
                max_retries: parse_env("SAGE_MAX_RETRIES", defaults.analysis.max_retries)?,
                stage_timeout_secs: parse_env(
                    "SAGE_STAGE_TIMEOUT_SECS",
                    defaults.analysis.stage_timeout_secs,
                )?,
            },
            context: ContextConfig {
                compaction_threshold_tokens: parse_env(
                    "SAGE_COMPACTION_THRESHOLD",
                    defaults.context.compaction_threshold_tokens,
                )?,
                preserve_recent_turns: parse_env(
                    "SAGE_PRESERVE_RECENT_TURNS",
                    defaults.context.preserve_recent_turns,
                )?,
            },
            memory: MemoryConfig {
                path: env::var("SAGE_MEMORY_PATH").ok().map(PathBuf::from),
            },
            report: ReportConfig {
                output_dir: env::var("SAGE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.report.output_dir),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.analysis.top_k, 10);
        assert_eq!(config.analysis.synthesis_limit, 5);
        assert_eq!(config.search.sources.len(), 2);
        assert_eq!(config.search.sources[0], "search_papers");
        assert_eq!(config.context.compaction_threshold_tokens, 2000);
    }

    #[test]
    fn test_timeout_helpers() {
        let config = Config::default();
        assert_eq!(config.search.per_source_timeout(), Duration::from_secs(20));
        assert_eq!(config.analysis.stage_timeout(), Duration::from_secs(30));
    }
}
