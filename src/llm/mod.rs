//! LLM client abstraction.
//!
//! Every model interaction in the crate goes through the [`LLMClient`]
//! trait and is treated as returning an untyped string, possibly
//! malformed. Call sites own their structural validation and fallbacks.

/// Provider-agnostic client trait.
pub mod client;
/// Google Gemini client over the generateContent REST API.
pub mod gemini;

pub use client::LLMClient;
pub use gemini::GeminiClient;
