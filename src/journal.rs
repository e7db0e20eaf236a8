//! Append-only JSONL journal of workflow activity.
//!
//! Workflow summaries, evaluation metrics, and errors each get their own
//! file so downstream tooling can tail them independently.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Value, json};

use crate::domain::WorkflowResult;
use crate::error::Result;
use crate::evaluation::EvaluationMetrics;

/// Summary of the errors journal.
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub total_errors: usize,
    /// The most recent entries, oldest first.
    pub recent: Vec<Value>,
}

/// Writes and reads the JSONL journal files under one directory.
pub struct Journal {
    workflow_log: PathBuf,
    metrics_log: PathBuf,
    errors_log: PathBuf,
}

impl Journal {
    /// Open a journal under the given directory, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            workflow_log: dir.join("workflows.jsonl"),
            metrics_log: dir.join("metrics.jsonl"),
            errors_log: dir.join("errors.jsonl"),
        })
    }

    /// Record a workflow summary.
    pub fn log_workflow(&self, result: &WorkflowResult) -> Result<()> {
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "type": "workflow",
            "workflow_id": result.workflow_id,
            "status": result.status,
            "stages_completed": result.metrics.stages_completed,
            "total_latency_ms": result.metrics.total_latency_ms,
            "total_tokens": result.metrics.total_tokens,
        });

        append(&self.workflow_log, &entry)
    }

    /// Record an evaluation.
    pub fn log_metrics(&self, metrics: &EvaluationMetrics) -> Result<()> {
        let mut entry = serde_json::to_value(metrics)?;
        entry["type"] = json!("metrics");

        append(&self.metrics_log, &entry)
    }

    /// Record an error with its context.
    pub fn log_error(&self, message: &str, context: &Value) -> Result<()> {
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "type": "error",
            "error_message": message,
            "context": context,
        });

        append(&self.errors_log, &entry)
    }

    /// The last `n` workflow entries, oldest first.
    pub fn recent_workflows(&self, n: usize) -> Result<Vec<Value>> {
        let entries = read_jsonl(&self.workflow_log)?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.into_iter().skip(skip).collect())
    }

    /// Error count and the five most recent error entries.
    pub fn error_summary(&self) -> Result<ErrorSummary> {
        let entries = read_jsonl(&self.errors_log)?;
        let skip = entries.len().saturating_sub(5);

        Ok(ErrorSummary {
            total_errors: entries.len(),
            recent: entries.into_iter().skip(skip).collect(),
        })
    }
}

fn append(path: &Path, entry: &Value) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", entry)?;
    Ok(())
}

fn read_jsonl(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}
