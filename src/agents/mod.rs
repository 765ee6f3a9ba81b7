//! Top-level coordination.
//!
//! The [`orchestrator::Orchestrator`] owns the session for one interactive
//! lifetime: it plans a research query into task groups, dispatches the
//! parallel search group and the sequential analysis group, persists what
//! was learned and keeps the session buffer under its token budget.

/// Planner and plan executor.
pub mod orchestrator;

pub use orchestrator::{Orchestrator, SessionState};
