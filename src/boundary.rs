//! Pre-loop boundary classification.
//!
//! One zero-temperature call decides whether a query touches a forbidden
//! topic. The check fails open: if the classification call itself fails,
//! the query is allowed and a warning is logged.

use log::{info, warn};

use crate::agent::{AgentExecutor, AgentRequest};
use crate::llm::GenerationConstraints;

/// Fixed reason attached to every rejection.
pub const REJECTION_REASON: &str = "Query rejected: relates to forbidden topics";

/// Outcome of a boundary check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl BoundaryDecision {
    /// The query may proceed.
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// The query is rejected with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Classifies queries against the configured forbidden topics.
pub struct BoundaryChecker {
    forbidden_topics: Vec<String>,
    constraints: GenerationConstraints,
}

impl BoundaryChecker {
    /// Create a checker for the given topic list. The classification call
    /// is deterministic: zero temperature, five output tokens.
    pub fn new(forbidden_topics: Vec<String>, model: Option<String>) -> Self {
        let mut constraints = GenerationConstraints::new().with_temperature(0.0).with_max_tokens(5);
        constraints.model = model;
        Self {
            forbidden_topics,
            constraints,
        }
    }

    fn classification_prompt(&self, query: &str) -> String {
        format!(
            "You are a strict compliance and content safety classifier.\n\
             Your task is to determine if the user's query relates to any forbidden topic.\n\n\
             Forbidden topics: {}.\n\n\
             User query: \"{}\"\n\n\
             Respond ONLY with 'YES' or 'NO'.\n\
             Say 'YES' if it clearly or indirectly involves any forbidden topic.\n\
             Say 'NO' if it does NOT relate to any forbidden topic.",
            self.forbidden_topics.join(", "),
            query
        )
    }

    /// Classify a query. A failed classification call allows the query.
    pub async fn check(&self, executor: &AgentExecutor, query: &str) -> BoundaryDecision {
        let request = AgentRequest::new(
            "compliance and ethics classifier",
            self.classification_prompt(query),
            self.constraints.clone(),
        );

        let response = executor.execute(request).await;

        if !response.is_success() {
            warn!(
                "boundary check unavailable ({}); allowing query",
                response.error().unwrap_or_default()
            );
            return BoundaryDecision::allowed();
        }

        if response.content().to_lowercase().contains("yes") {
            info!("boundary check rejected query: {}", query);
            return BoundaryDecision::rejected(REJECTION_REASON);
        }

        BoundaryDecision::allowed()
    }
}
