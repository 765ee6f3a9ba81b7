//! Parallel search coordination.
//!
//! Fans a single query out to every configured source concurrently through
//! the tool gateway, tolerates partial failure, and merges results into a
//! deterministic order regardless of completion order.

/// Fan-out, aggregation and per-source statistics.
pub mod coordinator;

pub use coordinator::{
    SearchCoordinator, SearchCriteria, SearchOutcome, SearchStatistics, SourceStats,
};
