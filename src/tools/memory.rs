//! Memory capabilities: long-term store and recall through the gateway.
//!
//! Routing memory effects through the gateway keeps them observable in
//! the invocation history alongside every other external effect.

use crate::memory::MemoryStore;
use crate::tools::gateway::Tool;
use crate::types::{AppError, Importance, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Stores a key/value pair in long-term memory (upsert).
pub struct MemoryStoreTool {
    store: Arc<MemoryStore>,
}

impl MemoryStoreTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryStoreTool {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn description(&self) -> &str {
        "Store information in long-term memory"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string"},
                "value": {"description": "Arbitrary JSON value to store"},
                "importance": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "default": "medium"
                }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidParameters("Missing 'key' parameter".to_string()))?
            .to_string();
        let value = args
            .get("value")
            .cloned()
            .ok_or_else(|| AppError::InvalidParameters("Missing 'value' parameter".to_string()))?;
        let importance = match args.get("importance").and_then(|v| v.as_str()) {
            Some("low") => Importance::Low,
            Some("high") => Importance::High,
            None | Some("medium") => Importance::Medium,
            Some(other) => {
                return Err(AppError::InvalidParameters(format!(
                    "Unknown importance '{}'",
                    other
                )))
            }
        };

        self.store.remember(&key, value, importance)?;
        Ok(json!({"stored": key}))
    }
}

/// Retrieves a record from long-term memory.
pub struct MemoryRecallTool {
    store: Arc<MemoryStore>,
}

impl MemoryRecallTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryRecallTool {
    fn name(&self) -> &str {
        "memory_recall"
    }

    fn description(&self) -> &str {
        "Retrieve information from long-term memory"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string"}
            },
            "required": ["key"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let key = args
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidParameters("Missing 'key' parameter".to_string()))?;

        match self.store.recall(key) {
            Some(record) => Ok(json!({
                "key": record.key,
                "value": record.value,
                "importance": record.importance,
                "timestamp": record.timestamp.to_rfc3339()
            })),
            None => Err(AppError::NotFound(format!("memory key '{}'", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_store_then_recall() {
        let store = store();
        let store_tool = MemoryStoreTool::new(store.clone());
        let recall_tool = MemoryRecallTool::new(store);

        store_tool
            .execute(json!({"key": "topic", "value": "transformers", "importance": "high"}))
            .await
            .unwrap();

        let payload = recall_tool.execute(json!({"key": "topic"})).await.unwrap();
        assert_eq!(payload["value"], "transformers");
        assert_eq!(payload["importance"], "high");
    }

    #[tokio::test]
    async fn test_recall_missing_key() {
        let recall_tool = MemoryRecallTool::new(store());
        let result = recall_tool.execute(json!({"key": "absent"})).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_importance_rejected() {
        let store_tool = MemoryStoreTool::new(store());
        let result = store_tool
            .execute(json!({"key": "k", "value": 1, "importance": "critical"}))
            .await;
        assert!(matches!(result, Err(AppError::InvalidParameters(_))));
    }
}
