//! Execution and measurement wrapper around the generation client.
//!
//! Every call is timed and bounded by an explicit deadline. Failures are
//! converted to data at this boundary; callers always get a response.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};
use tokio::time::timeout;

use crate::llm::{GenerationRequest, LlmClient};

use super::types::{AgentOutcome, AgentRequest, AgentResponse, FailureCause};

/// Executes agent calls against an injected client.
pub struct AgentExecutor {
    client: Arc<dyn LlmClient>,
    deadline: Duration,
}

impl AgentExecutor {
    /// Create an executor with a per-call deadline.
    pub fn new(client: Arc<dyn LlmClient>, deadline: Duration) -> Self {
        Self { client, deadline }
    }

    /// Execute one agent call. Never fails: timeouts and client errors
    /// come back as failure outcomes with the latency measured so far.
    pub async fn execute(&self, request: AgentRequest) -> AgentResponse {
        let start = Instant::now();

        let generation_request = GenerationRequest {
            system: format!("You are a {}.", request.role),
            user: request.prompt.clone(),
            constraints: request.constraints.clone(),
        };

        let outcome = match timeout(self.deadline, self.client.complete(generation_request)).await {
            Ok(Ok(generation)) => {
                debug!(
                    "agent call ok (role={}, request={}, tokens={})",
                    request.role, request.request_id, generation.usage.total_tokens
                );
                AgentOutcome::Success {
                    content: generation.content,
                    usage: generation.usage,
                }
            }
            Ok(Err(error)) => {
                warn!(
                    "agent call failed (role={}, request={}): {}",
                    request.role, request.request_id, error
                );
                AgentOutcome::Failure {
                    cause: FailureCause::from(error),
                }
            }
            Err(_) => {
                let after_ms = self.deadline.as_millis() as u64;
                warn!(
                    "agent call aborted at {}ms deadline (role={}, request={})",
                    after_ms, request.role, request.request_id
                );
                AgentOutcome::Failure {
                    cause: FailureCause::Timeout { after_ms },
                }
            }
        };

        AgentResponse {
            role: request.role,
            request_id: request.request_id,
            outcome,
            latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Generation, GenerationConstraints, LlmError, MockLlmClient, ScriptedReply, TokenUsage};
    use async_trait::async_trait;

    /// Client that never answers within any reasonable deadline.
    struct StalledClient;

    #[async_trait]
    impl LlmClient for StalledClient {
        async fn complete(&self, _request: GenerationRequest) -> Result<Generation, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Generation::default())
        }
    }

    fn executor_with(replies: Vec<ScriptedReply>) -> AgentExecutor {
        AgentExecutor::new(Arc::new(MockLlmClient::with_replies(replies)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_execute_success() {
        let executor = executor_with(vec![ScriptedReply::content("key findings")]);
        let response = executor
            .execute(AgentRequest::new("researcher", "research topic", GenerationConstraints::new()))
            .await;

        assert!(response.is_success());
        assert_eq!(response.content(), "key findings");
        assert_eq!(response.usage(), TokenUsage::new(100, 50));
        assert!(response.latency_ms >= 0.0);
        assert_eq!(response.role, "researcher");
    }

    #[tokio::test]
    async fn test_execute_failure_is_data() {
        let executor = executor_with(vec![ScriptedReply::failure("quota exceeded")]);
        let response = executor
            .execute(AgentRequest::new("analyzer", "analyze", GenerationConstraints::new()))
            .await;

        assert!(!response.is_success());
        assert_eq!(response.usage(), TokenUsage::default());
        assert!(response.error().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_execute_deadline_surfaces_timeout() {
        let executor = AgentExecutor::new(Arc::new(StalledClient), Duration::from_millis(20));
        let response = executor
            .execute(AgentRequest::new("validator", "validate", GenerationConstraints::new()))
            .await;

        assert!(!response.is_success());
        match response.outcome {
            AgentOutcome::Failure {
                cause: FailureCause::Timeout { after_ms },
            } => assert_eq!(after_ms, 20),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_builds_role_system_prompt() {
        let mock = Arc::new(MockLlmClient::with_replies(vec![ScriptedReply::content("ok")]));
        let executor = AgentExecutor::new(mock.clone(), Duration::from_secs(5));
        executor
            .execute(AgentRequest::new("validator", "check this", GenerationConstraints::new()))
            .await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, "You are a validator.");
        assert_eq!(calls[0].user, "check this");
    }
}
