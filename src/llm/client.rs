//! LLM client trait.

use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction.
///
/// Callers must treat the returned text as untrusted: the model may return
/// empty, truncated, or structurally invalid content, and every call site
/// is expected to validate and carry its own deterministic fallback.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}
