//! Capability layer: every external effect goes through the tool gateway.
//!
//! A capability is a named external effect (a search provider call, a
//! memory write, a report export) registered behind the [`gateway::Tool`]
//! trait. The gateway validates parameters, executes the handler, and
//! records every call in an append-only invocation history.
//!
//! # Module Structure
//!
//! - [`gateway`] - Tool trait, registry and invocation history
//! - [`papers`] - Scholarly paper search (Semantic Scholar Graph API)
//! - [`search`] - Web search capability (Serper-style JSON API)
//! - [`memory`] - Memory store/recall capabilities
//! - [`report`] - Report writer capability

/// Tool registry and invocation recording.
pub mod gateway;
/// Memory store/recall capabilities over the shared memory store.
pub mod memory;
/// Scholarly paper search capability.
pub mod papers;
/// Report export capability.
pub mod report;
/// Web search capability.
pub mod search;

pub use gateway::{HistoryFilter, Tool, ToolGateway};
