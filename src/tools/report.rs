//! Report writer capability: exports a text body to a destination file.

use crate::tools::gateway::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

pub struct ReportWriterTool {
    output_dir: PathBuf,
}

impl ReportWriterTool {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl Tool for ReportWriterTool {
    fn name(&self) -> &str {
        "report_write"
    }

    fn description(&self) -> &str {
        "Write a research report to a file in the output directory"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "destination": {
                    "type": "string",
                    "description": "File name inside the output directory"
                },
                "body": {
                    "type": "string",
                    "description": "Report text"
                }
            },
            "required": ["destination", "body"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let destination = args
            .get("destination")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AppError::InvalidParameters("Missing 'destination' parameter".to_string())
            })?;
        let body = args
            .get("body")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidParameters("Missing 'body' parameter".to_string()))?;

        // Destination must stay inside the output directory.
        if destination.is_empty()
            || destination.contains(['/', '\\'])
            || destination.contains("..")
        {
            return Err(AppError::InvalidParameters(format!(
                "Invalid destination '{}'",
                destination
            )));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(destination);
        tokio::fs::write(&path, body).await?;

        tracing::info!(path = %path.display(), bytes = body.len(), "report exported");
        Ok(json!({
            "path": path.to_string_lossy(),
            "bytes": body.len()
        }))
    }
}
