//! The workflow result contract.
//!
//! This is what `orchestrate` returns and what evaluation and journaling
//! consume downstream.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::TokenUsage;

use super::action::Action;

/// Status of a workflow's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created but the boundary check has not run yet
    NotStarted,
    /// Actively iterating
    Running,
    /// Goal achieved within the attempt budget
    Completed,
    /// An agent call failed mid-loop
    Failed,
    /// Attempt budget spent without achieving the goal
    MaxAttemptsReached,
    /// Boundary check disallowed the query before any iteration
    Rejected,
    /// Something failed before the loop could run at all
    Error,
}

impl WorkflowStatus {
    /// Returns true if the workflow is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::NotStarted | WorkflowStatus::Running)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowStatus::NotStarted => "not_started",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::MaxAttemptsReached => "max_attempts_reached",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Record of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub response: String,
    pub latency_ms: f64,
    pub tokens: TokenUsage,
    pub success: bool,
    pub attempt: u32,
    /// Present only on the validate stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// One planner decision and its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub attempt: u32,
    pub action: Action,
    pub reason: String,
    /// Score after the action; present only for validate.
    pub quality_after: Option<f64>,
}

/// Aggregate counters for a workflow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub total_latency_ms: f64,
    pub total_tokens: u64,
    pub stages_completed: usize,
    pub refinement_loops: u32,
    pub total_attempts: u32,
}

/// Result returned by `Orchestrator::orchestrate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub status: WorkflowStatus,

    /// Why the query was rejected; present only when status is rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Which action's call failed; present only when status is failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_action: Option<Action>,

    /// Per-stage records keyed by stage name.
    pub stages: BTreeMap<String, StageRecord>,

    /// Ordered log of planner decisions.
    pub action_sequence: Vec<ActionRecord>,

    pub metrics: WorkflowMetrics,
    pub final_quality_score: f64,
    pub goal_achieved: bool,

    /// Description of a pre-loop failure; present only when status is error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl WorkflowResult {
    /// Empty shell for a workflow, stamped now.
    pub fn new(workflow_id: impl Into<String>, status: WorkflowStatus) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            status,
            reason: None,
            failed_action: None,
            stages: BTreeMap::new(),
            action_sequence: Vec::new(),
            metrics: WorkflowMetrics::default(),
            final_quality_score: 0.0,
            goal_achieved: false,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Result for a query the boundary check disallowed.
    pub fn rejected(workflow_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(workflow_id, WorkflowStatus::Rejected);
        result.reason = Some(reason.into());
        result
    }

    /// Result for a failure before the loop could run.
    pub fn error(workflow_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::new(workflow_id, WorkflowStatus::Error);
        result.error = Some(message.into());
        result
    }

    /// The text of the stage holding the final analysis, preferring the
    /// latest refinement over the base analysis.
    pub fn final_output(&self) -> Option<&str> {
        for key in ["refine_minor", "refine_major", "analyze"] {
            if let Some(stage) = self.stages.get(key) {
                return Some(&stage.response);
            }
        }
        None
    }
}
