//! Tool gateway: standardized invocation layer over external capabilities.
//!
//! Registration is static at startup; the registry is read-only once the
//! gateway is constructed, so concurrent lookups need no synchronization.
//! Only the history requires a lock, and appends to it are serialized.

use crate::types::{InvocationOutcome, Result, ToolDefinition, ToolInvocation};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A registered capability.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema for the parameters; the top-level `required` array
    /// drives gateway-side validation.
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// Filter for querying the invocation history.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub capability: Option<String>,
    pub outcome: Option<InvocationOutcome>,
}

impl HistoryFilter {
    fn matches(&self, invocation: &ToolInvocation) -> bool {
        if let Some(ref capability) = self.capability {
            if invocation.capability != *capability {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if invocation.outcome != outcome {
                return false;
            }
        }
        true
    }
}

/// Standardized invocation layer over external capabilities.
///
/// Every call, success or failure, produces a [`ToolInvocation`] record in
/// the execution history; no invocation is silently dropped.
pub struct ToolGateway {
    tools: HashMap<String, Arc<dyn Tool>>,
    history: Mutex<Vec<ToolInvocation>>,
}

impl Default for ToolGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolGateway {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Registers a capability. Call during startup, before the gateway is
    /// shared; there is no handler replacement at runtime.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Invokes a capability and records the completed call.
    ///
    /// Validation failures (`UnknownCapability`, `InvalidParameters`) are
    /// recorded as failed invocations too; the returned envelope carries
    /// the outcome either way.
    pub async fn invoke(&self, capability: &str, params: Value) -> ToolInvocation {
        self.dispatch(capability, params, None).await
    }

    /// Invokes a capability with a deadline on the handler's execution.
    ///
    /// A handler that exceeds the deadline is cancelled and the call is
    /// recorded as a failed invocation with a timeout error, so timed-out
    /// calls are just as observable in history as any other failure.
    pub async fn invoke_with_deadline(
        &self,
        capability: &str,
        params: Value,
        deadline: Duration,
    ) -> ToolInvocation {
        self.dispatch(capability, params, Some(deadline)).await
    }

    async fn dispatch(
        &self,
        capability: &str,
        params: Value,
        deadline: Option<Duration>,
    ) -> ToolInvocation {
        let started_at = Utc::now();
        let clock = Instant::now();

        let result = match self.tools.get(capability) {
            None => Err(format!("Unknown capability: {}", capability)),
            Some(tool) => match validate_params(&tool.parameters_schema(), &params) {
                Err(message) => Err(message),
                Ok(()) => {
                    let call = tool.execute(params.clone());
                    match deadline {
                        None => call.await.map_err(|e| e.to_string()),
                        Some(limit) => match tokio::time::timeout(limit, call).await {
                            Ok(done) => done.map_err(|e| e.to_string()),
                            Err(_) => Err(format!("timed out after {:?}", limit)),
                        },
                    }
                }
            },
        };

        let duration_ms = clock.elapsed().as_millis() as u64;
        let (outcome, payload, error) = match result {
            Ok(payload) => (InvocationOutcome::Ok, Some(payload), None),
            Err(message) => (InvocationOutcome::Error, None, Some(message)),
        };

        let invocation = ToolInvocation {
            id: Uuid::new_v4(),
            capability: capability.to_string(),
            params,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            outcome,
            payload,
            error,
        };

        match invocation.outcome {
            InvocationOutcome::Ok => {
                tracing::debug!(capability, duration_ms, "capability call completed")
            }
            InvocationOutcome::Error => tracing::warn!(
                capability,
                duration_ms,
                error = invocation.error.as_deref().unwrap_or(""),
                "capability call failed"
            ),
        }

        self.history.lock().push(invocation.clone());
        invocation
    }

    /// Completed invocations matching `filter`, ordered by start time.
    pub fn history(&self, filter: &HistoryFilter) -> Vec<ToolInvocation> {
        let mut entries: Vec<ToolInvocation> = self
            .history
            .lock()
            .iter()
            .filter(|inv| filter.matches(inv))
            .cloned()
            .collect();
        entries.sort_by_key(|inv| inv.started_at);
        entries
    }

    /// Declarative descriptions of every registered capability.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    pub fn capability_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}

/// Checks that every key listed in the schema's top-level `required`
/// array is present in `params`.
fn validate_params(schema: &Value, params: &Value) -> std::result::Result<(), String> {
    let required = match schema.get("required").and_then(|r| r.as_array()) {
        Some(keys) => keys,
        None => return Ok(()),
    };

    if required.is_empty() {
        return Ok(());
    }

    let object = params
        .as_object()
        .ok_or_else(|| "Invalid parameters: expected a JSON object".to_string())?;

    for key in required.iter().filter_map(|k| k.as_str()) {
        if !object.contains_key(key) {
            return Err(format!("Invalid parameters: missing required key '{}'", key));
        }
    }

    Ok(())
}
