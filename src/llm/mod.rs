//! Generation client layer
//!
//! This module provides:
//! - Request/response types for generation calls
//! - LlmClient trait for backend abstraction
//! - OpenAiClient implementation
//! - MockLlmClient for tests

pub mod client;
pub mod openai;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient, ScriptedReply};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Generation, GenerationConstraints, GenerationRequest, TokenUsage,
};
