//! Post-workflow evaluation: metrics, requirement checks, aggregate report.
//!
//! One service instance may be shared across concurrently running
//! workflows; the metrics history is the only shared mutable collection
//! in the system and sits behind a mutex.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NonFunctionalRequirements;
use crate::domain::{WorkflowResult, WorkflowStatus};
use crate::llm::TokenUsage;
use crate::quality;

/// The three main stages counted for reliability.
const MAIN_STAGES: f64 = 3.0;

/// Relative change that counts as drift.
const DRIFT_THRESHOLD: f64 = 0.15;

/// Token-efficiency floor for the requirements check.
const MIN_TOKEN_EFFICIENCY: f64 = 0.5;

/// Metrics for a single evaluated workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub workflow_id: String,
    pub accuracy_score: f64,
    pub latency_ms: f64,
    pub token_efficiency: f64,
    pub reliability_score: f64,
    pub timestamp: DateTime<Utc>,
    pub stage_metrics: BTreeMap<String, StageMetrics>,
}

/// Per-stage slice of the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub latency_ms: f64,
    pub tokens: TokenUsage,
    pub success: bool,
}

/// Pass/fail verdicts for the non-functional requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsCheck {
    pub latency_ok: bool,
    pub accuracy_ok: bool,
    pub reliability_ok: bool,
    pub token_efficiency_ok: bool,
    pub all_requirements_met: bool,
}

/// Aggregate report over all evaluated workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_workflows: usize,
    pub average_accuracy: f64,
    pub average_latency_ms: f64,
    pub average_reliability: f64,
    pub average_token_efficiency: f64,
    pub success_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// Drift check outcome over a recent window.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub drift_detected: bool,
    pub samples: usize,
    /// Why no verdict could be reached, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability_drift: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    accuracy: f64,
    latency: f64,
    reliability: f64,
}

/// Evaluates workflow results and tracks history across workflows.
pub struct EvaluationService {
    requirements: NonFunctionalRequirements,
    history: Mutex<Vec<EvaluationMetrics>>,
    baseline: Mutex<Option<Baseline>>,
}

impl EvaluationService {
    /// Create a service checking against the given requirements.
    pub fn new(requirements: NonFunctionalRequirements) -> Self {
        Self {
            requirements,
            history: Mutex::new(Vec::new()),
            baseline: Mutex::new(None),
        }
    }

    /// Evaluate one workflow result and record it in the history.
    pub fn evaluate(&self, result: &WorkflowResult) -> EvaluationMetrics {
        let metrics = EvaluationMetrics {
            workflow_id: result.workflow_id.clone(),
            accuracy_score: accuracy(result),
            latency_ms: result.metrics.total_latency_ms,
            token_efficiency: token_efficiency(result),
            reliability_score: reliability(result),
            timestamp: Utc::now(),
            stage_metrics: result
                .stages
                .iter()
                .map(|(name, stage)| {
                    (
                        name.clone(),
                        StageMetrics {
                            latency_ms: stage.latency_ms,
                            tokens: stage.tokens,
                            success: stage.success,
                        },
                    )
                })
                .collect(),
        };

        self.history.lock().unwrap().push(metrics.clone());
        metrics
    }

    /// Check the non-functional requirements against one evaluation.
    pub fn check_requirements(&self, metrics: &EvaluationMetrics) -> RequirementsCheck {
        let latency_ok = metrics.latency_ms <= self.requirements.max_latency_ms;
        let accuracy_ok = metrics.accuracy_score >= self.requirements.min_accuracy_threshold;
        let reliability_ok = metrics.reliability_score >= self.requirements.min_reliability_threshold;
        let token_efficiency_ok = metrics.token_efficiency > MIN_TOKEN_EFFICIENCY;

        RequirementsCheck {
            latency_ok,
            accuracy_ok,
            reliability_ok,
            token_efficiency_ok,
            all_requirements_met: latency_ok && accuracy_ok && reliability_ok && token_efficiency_ok,
        }
    }

    /// Aggregate report over everything evaluated so far.
    pub fn report(&self) -> EvaluationReport {
        let history = self.history.lock().unwrap();

        if history.is_empty() {
            return EvaluationReport {
                total_workflows: 0,
                average_accuracy: 0.0,
                average_latency_ms: 0.0,
                average_reliability: 0.0,
                average_token_efficiency: 0.0,
                success_rate: 0.0,
                timestamp: Utc::now(),
            };
        }

        let successes = history.iter().filter(|m| m.reliability_score == 1.0).count();

        EvaluationReport {
            total_workflows: history.len(),
            average_accuracy: mean(history.iter().map(|m| m.accuracy_score)),
            average_latency_ms: mean(history.iter().map(|m| m.latency_ms)),
            average_reliability: mean(history.iter().map(|m| m.reliability_score)),
            average_token_efficiency: mean(history.iter().map(|m| m.token_efficiency)),
            success_rate: successes as f64 / history.len() as f64,
            timestamp: Utc::now(),
        }
    }

    /// Compare the most recent window against the baseline window.
    pub fn detect_drift(&self, window: usize) -> DriftReport {
        let history = self.history.lock().unwrap();

        if history.len() < window {
            return DriftReport {
                drift_detected: false,
                samples: history.len(),
                reason: Some("insufficient data".to_string()),
                accuracy_drift: None,
                latency_drift: None,
                reliability_drift: None,
            };
        }

        let mut baseline = self.baseline.lock().unwrap();
        if baseline.is_none() && history.len() >= window * 2 {
            let first = &history[..window];
            *baseline = Some(Baseline {
                accuracy: mean(first.iter().map(|m| m.accuracy_score)),
                latency: mean(first.iter().map(|m| m.latency_ms)),
                reliability: mean(first.iter().map(|m| m.reliability_score)),
            });
        }

        let Some(base) = *baseline else {
            return DriftReport {
                drift_detected: false,
                samples: history.len(),
                reason: Some("baseline not established".to_string()),
                accuracy_drift: None,
                latency_drift: None,
                reliability_drift: None,
            };
        };

        let recent = &history[history.len() - window..];
        let accuracy_drift = relative_drift(mean(recent.iter().map(|m| m.accuracy_score)), base.accuracy);
        let latency_drift = relative_drift(mean(recent.iter().map(|m| m.latency_ms)), base.latency);
        let reliability_drift = relative_drift(mean(recent.iter().map(|m| m.reliability_score)), base.reliability);

        DriftReport {
            drift_detected: accuracy_drift > DRIFT_THRESHOLD
                || latency_drift > DRIFT_THRESHOLD
                || reliability_drift > DRIFT_THRESHOLD,
            samples: history.len(),
            reason: None,
            accuracy_drift: Some(accuracy_drift),
            latency_drift: Some(latency_drift),
            reliability_drift: Some(reliability_drift),
        }
    }
}

/// Accuracy from the validate stage, re-parsed from its response.
fn accuracy(result: &WorkflowResult) -> f64 {
    match result.stages.get("validate") {
        Some(stage) if stage.success => quality::extract_score(&stage.response),
        _ => 0.0,
    }
}

/// Completion tokens produced per prompt token spent.
fn token_efficiency(result: &WorkflowResult) -> f64 {
    let mut prompt_tokens = 0u64;
    let mut completion_tokens = 0u64;

    for stage in result.stages.values() {
        prompt_tokens += stage.tokens.prompt_tokens;
        completion_tokens += stage.tokens.completion_tokens;
    }

    if prompt_tokens == 0 {
        0.0
    } else {
        completion_tokens as f64 / prompt_tokens as f64
    }
}

/// Stage success rate as a proxy for dependability.
fn reliability(result: &WorkflowResult) -> f64 {
    match result.status {
        WorkflowStatus::Rejected => 0.0,
        WorkflowStatus::Failed => result.metrics.stages_completed as f64 / MAIN_STAGES,
        _ => 1.0,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn relative_drift(recent: f64, baseline: f64) -> f64 {
    (recent - baseline).abs() / (baseline + 0.001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StageRecord;

    fn requirements() -> NonFunctionalRequirements {
        NonFunctionalRequirements::default()
    }

    fn completed_result(quality_line: &str) -> WorkflowResult {
        let mut result = WorkflowResult::new("wf-001", WorkflowStatus::Completed);
        for (name, response) in [("research", "findings"), ("analyze", "analysis"), ("validate", quality_line)] {
            result.stages.insert(
                name.to_string(),
                StageRecord {
                    response: response.to_string(),
                    latency_ms: 100.0,
                    tokens: TokenUsage::new(100, 80),
                    success: true,
                    attempt: 1,
                    quality_score: None,
                },
            );
        }
        result.metrics.total_latency_ms = 300.0;
        result.metrics.stages_completed = 3;
        result
    }

    #[test]
    fn test_evaluate_completed_workflow() {
        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&completed_result("Overall Quality Score: 85"));

        assert!((metrics.accuracy_score - 0.85).abs() < f64::EPSILON);
        assert!((metrics.reliability_score - 1.0).abs() < f64::EPSILON);
        assert!((metrics.token_efficiency - 0.8).abs() < f64::EPSILON);
        assert_eq!(metrics.stage_metrics.len(), 3);
    }

    #[test]
    fn test_reliability_of_failed_workflow() {
        let mut result = completed_result("Overall Quality Score: 85");
        result.status = WorkflowStatus::Failed;
        result.metrics.stages_completed = 2;

        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&result);
        assert!((metrics.reliability_score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reliability_of_rejected_workflow() {
        let result = WorkflowResult::rejected("wf-002", "forbidden");
        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&result);
        assert_eq!(metrics.reliability_score, 0.0);
        assert_eq!(metrics.accuracy_score, 0.0);
        assert_eq!(metrics.token_efficiency, 0.0);
    }

    #[test]
    fn test_accuracy_zero_when_validate_failed() {
        let mut result = completed_result("Overall Quality Score: 85");
        result.stages.get_mut("validate").unwrap().success = false;

        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&result);
        assert_eq!(metrics.accuracy_score, 0.0);
    }

    #[test]
    fn test_check_requirements_pass() {
        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&completed_result("Overall Quality Score: 85"));
        let check = service.check_requirements(&metrics);

        assert!(check.latency_ok);
        assert!(check.accuracy_ok);
        assert!(check.reliability_ok);
        assert!(check.token_efficiency_ok);
        assert!(check.all_requirements_met);
    }

    #[test]
    fn test_check_requirements_low_accuracy_fails() {
        let service = EvaluationService::new(requirements());
        let metrics = service.evaluate(&completed_result("Overall Quality Score: 60"));
        let check = service.check_requirements(&metrics);

        assert!(!check.accuracy_ok);
        assert!(!check.all_requirements_met);
    }

    #[test]
    fn test_report_empty_history_is_zeroed() {
        let service = EvaluationService::new(requirements());
        let report = service.report();
        assert_eq!(report.total_workflows, 0);
        assert_eq!(report.average_accuracy, 0.0);
        assert_eq!(report.success_rate, 0.0);
    }

    #[test]
    fn test_report_averages() {
        let service = EvaluationService::new(requirements());
        service.evaluate(&completed_result("Overall Quality Score: 80"));
        service.evaluate(&completed_result("Overall Quality Score: 90"));

        let report = service.report();
        assert_eq!(report.total_workflows, 2);
        assert!((report.average_accuracy - 0.85).abs() < 1e-9);
        assert!((report.success_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detect_drift_insufficient_data() {
        let service = EvaluationService::new(requirements());
        service.evaluate(&completed_result("Overall Quality Score: 80"));

        let drift = service.detect_drift(10);
        assert!(!drift.drift_detected);
        assert_eq!(drift.reason.as_deref(), Some("insufficient data"));
    }

    #[test]
    fn test_detect_drift_stable_history() {
        let service = EvaluationService::new(requirements());
        for _ in 0..6 {
            service.evaluate(&completed_result("Overall Quality Score: 80"));
        }

        let drift = service.detect_drift(3);
        assert!(!drift.drift_detected);
        assert_eq!(drift.accuracy_drift, Some(0.0));
    }

    #[test]
    fn test_detect_drift_accuracy_shift() {
        let service = EvaluationService::new(requirements());
        for _ in 0..3 {
            service.evaluate(&completed_result("Overall Quality Score: 90"));
        }
        // Establish the baseline window, then degrade
        for _ in 0..3 {
            service.evaluate(&completed_result("Overall Quality Score: 40"));
        }

        let drift = service.detect_drift(3);
        assert!(drift.drift_detected);
        assert!(drift.accuracy_drift.unwrap() > DRIFT_THRESHOLD);
    }

    #[test]
    fn test_history_is_shareable_across_threads() {
        use std::sync::Arc;

        let service = Arc::new(EvaluationService::new(requirements()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    service.evaluate(&completed_result("Overall Quality Score: 80"));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.report().total_workflows, 4);
    }
}
