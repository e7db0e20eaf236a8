//! Core workflow domain types

pub mod action;
pub mod result;
pub mod state;

pub use action::Action;
pub use result::{ActionRecord, StageRecord, WorkflowMetrics, WorkflowResult, WorkflowStatus};
pub use state::WorkflowState;
