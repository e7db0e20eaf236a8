//! Request/response envelopes for role-based agent calls.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_request_id;
use crate::llm::{GenerationConstraints, LlmError, TokenUsage};

/// A single role-based generation request with its correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub role: String,
    pub prompt: String,
    pub constraints: GenerationConstraints,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentRequest {
    /// Create a request for the given role, stamping a correlation id.
    pub fn new(role: impl Into<String>, prompt: impl Into<String>, constraints: GenerationConstraints) -> Self {
        let role = role.into();
        let request_id = generate_request_id(&role);
        Self {
            role,
            prompt: prompt.into(),
            constraints,
            request_id,
            timestamp: Utc::now(),
        }
    }
}

/// Why an agent call failed. Every transport, API, and parse failure is
/// captured here; nothing escapes the executor as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The call exceeded the per-call deadline and was aborted.
    Timeout { after_ms: u64 },
    /// The backend rejected the call for rate limiting.
    RateLimited,
    /// The backend returned an error status.
    Api { status: u16, message: String },
    /// The request never completed at the transport level.
    Network { message: String },
    /// The backend replied with something unparseable.
    MalformedResponse { message: String },
    /// The client could not be used at all (e.g. missing credentials).
    Unavailable { message: String },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            FailureCause::RateLimited => write!(f, "rate limited"),
            FailureCause::Api { status, message } => write!(f, "API error {}: {}", status, message),
            FailureCause::Network { message } => write!(f, "network error: {}", message),
            FailureCause::MalformedResponse { message } => write!(f, "malformed response: {}", message),
            FailureCause::Unavailable { message } => write!(f, "client unavailable: {}", message),
        }
    }
}

impl From<LlmError> for FailureCause {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::RateLimited { .. } => FailureCause::RateLimited,
            LlmError::Api { status, message } => FailureCause::Api { status, message },
            LlmError::Network(e) => FailureCause::Network { message: e.to_string() },
            LlmError::InvalidResponse(message) => FailureCause::MalformedResponse { message },
            LlmError::Json(e) => FailureCause::MalformedResponse { message: e.to_string() },
            LlmError::MissingApiKey { env_var } => FailureCause::Unavailable {
                message: format!("{} not set", env_var),
            },
        }
    }
}

/// Outcome of one agent call: content and usage, or a typed failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgentOutcome {
    Success { content: String, usage: TokenUsage },
    Failure { cause: FailureCause },
}

/// Response from one agent call with its measurements. Immutable once
/// produced; the loop only reads fields into workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub role: String,
    pub request_id: String,
    pub outcome: AgentOutcome,
    pub latency_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// Whether the call produced content.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AgentOutcome::Success { .. })
    }

    /// Generated content; empty on failure.
    pub fn content(&self) -> &str {
        match &self.outcome {
            AgentOutcome::Success { content, .. } => content,
            AgentOutcome::Failure { .. } => "",
        }
    }

    /// Token usage; zero on failure.
    pub fn usage(&self) -> TokenUsage {
        match &self.outcome {
            AgentOutcome::Success { usage, .. } => *usage,
            AgentOutcome::Failure { .. } => TokenUsage::default(),
        }
    }

    /// Failure description, if any.
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            AgentOutcome::Success { .. } => None,
            AgentOutcome::Failure { cause } => Some(cause.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_response() -> AgentResponse {
        AgentResponse {
            role: "researcher".to_string(),
            request_id: "researcher-1-abcd".to_string(),
            outcome: AgentOutcome::Success {
                content: "findings".to_string(),
                usage: TokenUsage::new(100, 50),
            },
            latency_ms: 12.5,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_request_new_stamps_correlation_id() {
        let request = AgentRequest::new("analyzer", "analyze this", GenerationConstraints::new());
        assert_eq!(request.role, "analyzer");
        assert!(request.request_id.starts_with("analyzer-"));
    }

    #[test]
    fn test_success_accessors() {
        let response = success_response();
        assert!(response.is_success());
        assert_eq!(response.content(), "findings");
        assert_eq!(response.usage().total_tokens, 150);
        assert!(response.error().is_none());
    }

    #[test]
    fn test_failure_accessors() {
        let response = AgentResponse {
            outcome: AgentOutcome::Failure {
                cause: FailureCause::Api {
                    status: 500,
                    message: "internal error".to_string(),
                },
            },
            ..success_response()
        };

        assert!(!response.is_success());
        assert_eq!(response.content(), "");
        assert_eq!(response.usage(), TokenUsage::default());
        assert_eq!(response.error().unwrap(), "API error 500: internal error");
    }

    #[test]
    fn test_failure_cause_from_llm_error() {
        let cause = FailureCause::from(LlmError::InvalidResponse("empty body".to_string()));
        assert_eq!(
            cause,
            FailureCause::MalformedResponse {
                message: "empty body".to_string()
            }
        );

        let cause = FailureCause::from(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        });
        assert!(matches!(cause, FailureCause::Api { status: 503, .. }));
    }

    #[test]
    fn test_failure_cause_serialization_tag() {
        let cause = FailureCause::Timeout { after_ms: 30_000 };
        let json = serde_json::to_value(&cause).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["after_ms"], 30_000);
    }
}
