//! Workflow execution

pub mod orchestrator;

pub use orchestrator::Orchestrator;
