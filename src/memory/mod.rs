//! Long-term memory and session context management.
//!
//! Two owners with different lifetimes live here:
//!
//! - [`MemoryStore`] - flat keyed long-term memory with last-write-wins
//!   upsert semantics, surviving session resets. Optionally snapshotted to
//!   a JSON file.
//! - [`context_manager::ContextManager`] - the rolling session turn buffer
//!   with tracked approximate size and threshold-triggered compaction.
//!
//! High-importance records belong in the store, never in the buffer:
//! compaction is lossy by design and must not touch them.

use crate::types::{Importance, MemoryRecord, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Session context buffer and compaction.
pub mod context_manager;

pub use context_manager::ContextManager;

/// Flat keyed long-term memory, last-write-wins.
///
/// Writes take the write lock for their full duration (including the
/// snapshot write when persistence is enabled), so they are serialized and
/// a concurrent reader observes either the pre- or post-write record,
/// never a partial one.
pub struct MemoryStore {
    records: RwLock<HashMap<String, MemoryRecord>>,
    path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// In-memory store without persistence.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    /// Store snapshotted to a JSON file, loading any existing snapshot.
    pub fn with_persistence(path: PathBuf) -> Result<Self> {
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "memory snapshot unreadable, starting empty");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            path: Some(path),
        })
    }

    /// Upserts a record. Overwrites value, importance and timestamp for an
    /// existing key.
    pub fn remember(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        importance: Importance,
    ) -> Result<()> {
        let key = key.into();
        let record = MemoryRecord {
            key: key.clone(),
            value,
            importance,
            timestamp: Utc::now(),
        };

        let mut records = self.records.write();
        records.insert(key, record);
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_string_pretty(&*records)
                .map_err(|e| crate::types::AppError::Internal(e.to_string()))?;
            std::fs::write(path, raw)?;
        }
        Ok(())
    }

    /// Looks up a record by key.
    pub fn recall(&self, key: &str) -> Option<MemoryRecord> {
        self.records.read().get(key).cloned()
    }

    /// All records at or above the given importance.
    pub fn records_at_least(&self, importance: Importance) -> Vec<MemoryRecord> {
        self.records
            .read()
            .values()
            .filter(|r| r.importance >= importance)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
