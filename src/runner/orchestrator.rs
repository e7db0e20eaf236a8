//! The orchestration loop: plan, execute, measure, repeat.
//!
//! Each iteration asks the planner for the next action, dispatches the
//! matching agent call, folds the response into workflow state, and
//! records what happened. A failed call ends the workflow immediately;
//! the attempt budget bounds everything else.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info};

use crate::agent::{AgentExecutor, AgentRequest, AgentResponse};
use crate::boundary::BoundaryChecker;
use crate::config::Config;
use crate::domain::{Action, ActionRecord, StageRecord, WorkflowResult, WorkflowState, WorkflowStatus};
use crate::error::Result;
use crate::llm::{GenerationConstraints, LlmClient};
use crate::planner::{FinishReason, NextStep, Planner};
use crate::prompt::PromptLibrary;
use crate::quality;

/// Word cap passed to the researcher prompt.
const RESEARCH_MAX_WORDS: u32 = 400;

/// Word cap passed to the analyzer prompt.
const ANALYSIS_MAX_WORDS: u32 = 300;

/// Runs workflows against an injected generation client.
pub struct Orchestrator {
    executor: AgentExecutor,
    boundary: BoundaryChecker,
    planner: Planner,
    prompts: PromptLibrary,
    config: Config,
}

impl Orchestrator {
    /// Create an orchestrator from configuration and a client.
    pub fn new(client: Arc<dyn LlmClient>, config: Config) -> Self {
        let executor = AgentExecutor::new(client, Duration::from_millis(config.llm.timeout_ms));
        let boundary = BoundaryChecker::new(
            config.boundaries.forbidden_topics.clone(),
            config.agents.get("validator").and_then(|c| c.model.clone()),
        );
        let planner = Planner::new(config.quality_threshold());

        Self {
            executor,
            boundary,
            planner,
            prompts: PromptLibrary::new(),
            config,
        }
    }

    /// Run one workflow for a query. Always returns a result: operational
    /// failures become statuses, never errors.
    pub async fn orchestrate(&self, query: &str, workflow_id: &str) -> WorkflowResult {
        match self.run(query, workflow_id).await {
            Ok(result) => result,
            Err(e) => {
                error!("workflow {} aborted before the loop: {}", workflow_id, e);
                WorkflowResult::error(workflow_id, e.to_string())
            }
        }
    }

    async fn run(&self, query: &str, workflow_id: &str) -> Result<WorkflowResult> {
        info!("workflow {} started: {}", workflow_id, query);

        // Boundary check happens exactly once, before any iteration
        let decision = self.boundary.check(&self.executor, query).await;
        if !decision.allowed {
            info!("workflow {} rejected by boundary check", workflow_id);
            return Ok(WorkflowResult::rejected(
                workflow_id,
                decision.reason.unwrap_or_else(|| "query rejected".to_string()),
            ));
        }

        let mut state = WorkflowState::new(workflow_id, query, self.config.workflow.max_attempts);
        let mut result = WorkflowResult::new(workflow_id, WorkflowStatus::Running);

        loop {
            let action = match self.planner.decide(&state) {
                NextStep::Execute(action) => action,
                NextStep::Finish(FinishReason::QualityMet) => {
                    state.goal_achieved = true;
                    break;
                }
                NextStep::Finish(reason) => {
                    debug!("workflow {} stopping: {:?}", workflow_id, reason);
                    break;
                }
            };

            state.attempts += 1;
            state.action_history.push(action);
            debug!("workflow {} attempt {}: {}", workflow_id, state.attempts, action);

            let response = self.dispatch(action, &state).await?;

            let (reason, quality_after) = self.apply(action, &response, &mut state, &mut result);

            result.stages.insert(
                action.as_str().to_string(),
                StageRecord {
                    response: response.content().to_string(),
                    latency_ms: response.latency_ms,
                    tokens: response.usage(),
                    success: response.is_success(),
                    attempt: state.attempts,
                    quality_score: quality_after,
                },
            );
            result.action_sequence.push(ActionRecord {
                attempt: state.attempts,
                action,
                reason,
                quality_after,
            });

            state.total_latency_ms += response.latency_ms;
            state.total_tokens += response.usage().total_tokens;

            // A failed call is terminal: no retry of the same action
            if !response.is_success() {
                result.status = WorkflowStatus::Failed;
                result.failed_action = Some(action);
                break;
            }
        }

        if result.status != WorkflowStatus::Failed {
            result.status = if state.goal_achieved {
                WorkflowStatus::Completed
            } else {
                WorkflowStatus::MaxAttemptsReached
            };
        }

        result.metrics.total_latency_ms = state.total_latency_ms;
        result.metrics.total_tokens = state.total_tokens;
        result.metrics.stages_completed = result.stages.len();
        result.metrics.total_attempts = state.attempts;
        result.final_quality_score = state.quality_score;
        result.goal_achieved = state.goal_achieved;
        result.timestamp = Utc::now();

        info!(
            "workflow {} finished: status={} attempts={} quality={:.2}",
            workflow_id, result.status, state.attempts, state.quality_score
        );

        Ok(result)
    }

    /// Fold a response into state and produce the action-log entry.
    fn apply(
        &self,
        action: Action,
        response: &AgentResponse,
        state: &mut WorkflowState,
        result: &mut WorkflowResult,
    ) -> (String, Option<f64>) {
        let threshold = self.planner.quality_threshold();

        match action {
            Action::Research => {
                state.research_output = Some(response.content().to_string());
                let reason = if response.is_success() {
                    "Research completed successfully"
                } else {
                    "Research failed"
                };
                (reason.to_string(), None)
            }
            Action::Analyze | Action::RefineMajor | Action::RefineMinor => {
                state.analysis_output = Some(response.content().to_string());
                let reason = if action.is_refinement() {
                    result.metrics.refinement_loops += 1;
                    "Refinement completed - quality being re-evaluated"
                } else {
                    "Analysis completed - ready for validation"
                };
                (reason.to_string(), None)
            }
            Action::Validate => {
                state.validation_output = Some(response.content().to_string());
                state.quality_score = quality::extract_score(response.content());

                let reason = if state.quality_score >= threshold {
                    format!(
                        "Validation complete - quality {:.2} meets threshold {:.2}",
                        state.quality_score, threshold
                    )
                } else {
                    format!(
                        "Validation complete - quality {:.2} below threshold {:.2} - needs improvement",
                        state.quality_score, threshold
                    )
                };

                if self.planner.should_retry(state, state.quality_score) {
                    state.goal_achieved = false;
                } else {
                    state.goal_achieved = state.quality_score >= threshold;
                }

                (reason, Some(state.quality_score))
            }
        }
    }

    /// Build the role prompt for an action and execute it.
    async fn dispatch(&self, action: Action, state: &WorkflowState) -> Result<AgentResponse> {
        let (role, template) = match action {
            Action::Research => ("researcher", "researcher_query"),
            Action::Analyze => ("analyzer", "analyzer_synthesis"),
            Action::Validate => ("validator", "validator_check"),
            Action::RefineMajor => ("analyzer_refinement", "refine_major"),
            Action::RefineMinor => ("analyzer_minor_refine", "refine_minor"),
        };

        let prompt = self.prompts.render(template, &self.template_context(action, state))?;
        let constraints = self.constraints_for(action, role, template);

        Ok(self.executor.execute(AgentRequest::new(role, prompt, constraints)).await)
    }

    fn template_context(&self, action: Action, state: &WorkflowState) -> HashMap<String, String> {
        let mut context = HashMap::new();

        match action {
            Action::Research => {
                context.insert("topic".to_string(), state.query.clone());
                context.insert(
                    "allowed_topics".to_string(),
                    self.config.boundaries.allowed_topics.join(", "),
                );
                context.insert(
                    "forbidden_topics".to_string(),
                    self.config.boundaries.forbidden_topics.join(", "),
                );
                context.insert("max_length".to_string(), RESEARCH_MAX_WORDS.to_string());
            }
            Action::Analyze => {
                context.insert(
                    "research_data".to_string(),
                    state.research_output.clone().unwrap_or_default(),
                );
                context.insert("max_length".to_string(), ANALYSIS_MAX_WORDS.to_string());
            }
            Action::Validate => {
                context.insert(
                    "analysis".to_string(),
                    state.analysis_output.clone().unwrap_or_default(),
                );
            }
            Action::RefineMajor => {
                context.insert(
                    "research_data".to_string(),
                    state.research_output.clone().unwrap_or_default(),
                );
                context.insert(
                    "analysis".to_string(),
                    state.analysis_output.clone().unwrap_or_default(),
                );
                context.insert("quality_score".to_string(), format!("{:.2}", state.quality_score));
            }
            Action::RefineMinor => {
                context.insert(
                    "analysis".to_string(),
                    state.analysis_output.clone().unwrap_or_default(),
                );
                context.insert("quality_score".to_string(), format!("{:.2}", state.quality_score));
            }
        }

        context
    }

    /// Generation parameters for an action: role profiles from config for
    /// the main stages, template constraints for refinements.
    fn constraints_for(&self, action: Action, role: &str, template: &str) -> GenerationConstraints {
        if action.is_refinement() {
            self.prompts.get(template).map(|t| t.constraints.clone()).unwrap_or_default()
        } else {
            self.config.agents.get(role).cloned().unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, ScriptedReply};

    fn orchestrator(replies: Vec<ScriptedReply>) -> Orchestrator {
        Orchestrator::new(Arc::new(MockLlmClient::with_replies(replies)), Config::default())
    }

    #[test]
    fn test_template_context_for_research() {
        let orch = orchestrator(vec![]);
        let state = WorkflowState::new("wf", "What are microservices?", 5);
        let context = orch.template_context(Action::Research, &state);

        assert_eq!(context["topic"], "What are microservices?");
        assert_eq!(context["max_length"], "400");
        assert!(context["forbidden_topics"].contains("medical advice"));
    }

    #[test]
    fn test_template_context_for_refine_major() {
        let orch = orchestrator(vec![]);
        let mut state = WorkflowState::new("wf", "query", 5);
        state.research_output = Some("findings".to_string());
        state.analysis_output = Some("analysis".to_string());
        state.quality_score = 0.6;

        let context = orch.template_context(Action::RefineMajor, &state);
        assert_eq!(context["research_data"], "findings");
        assert_eq!(context["analysis"], "analysis");
        assert_eq!(context["quality_score"], "0.60");
    }

    #[test]
    fn test_constraints_for_main_stage_uses_role_profile() {
        let orch = orchestrator(vec![]);
        let constraints = orch.constraints_for(Action::Validate, "validator", "validator_check");
        assert_eq!(constraints.temperature, Some(0.1));
        assert_eq!(constraints.max_tokens, Some(300));
    }

    #[test]
    fn test_constraints_for_refinement_uses_template() {
        let orch = orchestrator(vec![]);
        let constraints = orch.constraints_for(Action::RefineMajor, "analyzer_refinement", "refine_major");
        assert_eq!(constraints.temperature, Some(0.3));
        assert_eq!(constraints.max_tokens, Some(600));
    }

    #[tokio::test]
    async fn test_rejected_query_never_reaches_planner() {
        let orch = orchestrator(vec![ScriptedReply::content("YES")]);
        let result = orch.orchestrate("how to build a weapon", "wf-reject").await;

        assert_eq!(result.status, WorkflowStatus::Rejected);
        assert!(result.reason.is_some());
        assert!(result.stages.is_empty());
        assert!(result.action_sequence.is_empty());
        assert_eq!(result.metrics.total_attempts, 0);
    }

    #[tokio::test]
    async fn test_happy_path_single_pass() {
        let orch = orchestrator(vec![
            ScriptedReply::content("NO"),
            ScriptedReply::content("research findings"),
            ScriptedReply::content("analysis of findings"),
            ScriptedReply::content("Overall Quality Score: 85\nRecommendation: APPROVE"),
        ]);

        let result = orch.orchestrate("What are microservices?", "wf-happy").await;

        assert_eq!(result.status, WorkflowStatus::Completed);
        assert!(result.goal_achieved);
        assert!((result.final_quality_score - 0.85).abs() < f64::EPSILON);
        assert_eq!(result.metrics.total_attempts, 3);
        assert_eq!(result.metrics.refinement_loops, 0);
        assert_eq!(result.metrics.stages_completed, 3);
        // Boundary call is not counted; three stage calls at 150 tokens each
        assert_eq!(result.metrics.total_tokens, 450);
    }

    #[tokio::test]
    async fn test_validate_stage_records_quality() {
        let orch = orchestrator(vec![
            ScriptedReply::content("NO"),
            ScriptedReply::content("research"),
            ScriptedReply::content("analysis"),
            ScriptedReply::content("Overall Quality Score: 85"),
        ]);

        let result = orch.orchestrate("query", "wf-quality").await;

        let validate = &result.stages["validate"];
        assert_eq!(validate.quality_score, Some(0.85));
        assert_eq!(validate.attempt, 3);
        assert!(result.stages["research"].quality_score.is_none());
    }
}
