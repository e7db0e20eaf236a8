//! Client trait and error types for the generation backend.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{Generation, GenerationRequest, TokenUsage};

/// Stateless generation client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: GenerationRequest) -> Result<Generation, LlmError>;
}

/// Errors that can occur during generation calls
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

/// A scripted reply for the mock client.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Succeed with this content.
    Content(String),
    /// Fail with this message (surfaced as an invalid-response error).
    Failure(String),
}

impl ScriptedReply {
    /// Shorthand for a successful reply.
    pub fn content(text: impl Into<String>) -> Self {
        ScriptedReply::Content(text.into())
    }

    /// Shorthand for a failed reply.
    pub fn failure(message: impl Into<String>) -> Self {
        ScriptedReply::Failure(message.into())
    }
}

/// Mock client returning queued replies in order. Every successful reply
/// reports a fixed 100/50 token usage so tests can assert totals.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockLlmClient {
    /// Create a mock with no scripted replies.
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Create a mock that plays back the given replies in order.
    pub fn with_replies(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: GenerationRequest) -> Result<Generation, LlmError> {
        self.calls.lock().unwrap().push(request);

        match self.replies.lock().unwrap().pop_front() {
            Some(ScriptedReply::Content(text)) => Ok(Generation {
                content: text,
                usage: TokenUsage::new(100, 50),
            }),
            Some(ScriptedReply::Failure(message)) => Err(LlmError::InvalidResponse(message)),
            None => Err(LlmError::InvalidResponse("no scripted reply queued".to_string())),
        }
    }
}
