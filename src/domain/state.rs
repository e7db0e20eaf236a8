//! Per-workflow mutable state.

use serde::{Deserialize, Serialize};

use super::action::Action;

/// State owned by a single orchestration run. Never shared across
/// workflows; the loop is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    //=== Identity ===
    pub workflow_id: String,
    pub query: String,

    //=== Goal tracking ===
    /// True only once validated quality reached the threshold.
    pub goal_achieved: bool,
    /// Actions executed so far. Increments by one per loop iteration.
    pub attempts: u32,
    /// Attempt budget; the loop stops when attempts reach it.
    pub max_attempts: u32,

    //=== Stage outputs ===
    pub research_output: Option<String>,
    pub analysis_output: Option<String>,
    pub validation_output: Option<String>,
    /// Score from the latest validation, in [0, 1].
    pub quality_score: f64,

    //=== History and totals ===
    pub action_history: Vec<Action>,
    pub total_latency_ms: f64,
    pub total_tokens: u64,
}

impl WorkflowState {
    /// Fresh state for a new workflow.
    pub fn new(workflow_id: impl Into<String>, query: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            query: query.into(),
            goal_achieved: false,
            attempts: 0,
            max_attempts,
            research_output: None,
            analysis_output: None,
            validation_output: None,
            quality_score: 0.0,
            action_history: Vec::new(),
            total_latency_ms: 0.0,
            total_tokens: 0,
        }
    }

    /// True once the attempt budget is spent.
    pub fn budget_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}
