//! Types for generation requests and responses
//!
//! This module defines the request/response shapes shared by every
//! generation backend.

use serde::{Deserialize, Serialize};

/// Default sampling temperature when a profile names none.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Default output cap in tokens when a profile names none.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Everything needed for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System prompt establishing the agent role.
    pub system: String,

    /// User prompt rendered from a template.
    pub user: String,

    /// Per-call generation parameters.
    pub constraints: GenerationConstraints,
}

/// Per-call generation parameters. Absent fields fall back to defaults
/// at the point of use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConstraints {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationConstraints {
    /// Create empty constraints (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Temperature with the default applied.
    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Output cap with the default applied.
    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// Successful generation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Generation {
    pub content: String,
    pub usage: TokenUsage,
}

/// Token usage as reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create usage stats; the total is derived.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate usage from another instance.
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}
