//! Error types for Questor
//!
//! Centralized error handling using thiserror. Failures of individual
//! agent calls are not errors in this sense: the executor converts them
//! to data and the orchestrator returns them inside the workflow result.

use thiserror::Error;

/// All error types that can occur in Questor
#[derive(Debug, Error)]
pub enum QuestorError {
    /// Configuration is missing or invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Prompt template lookup or rendering failed
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Questor operations
pub type Result<T> = std::result::Result<T, QuestorError>;
