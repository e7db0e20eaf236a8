//! The closed set of actions the planner can choose.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step the orchestration loop can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Gather information for the query
    Research,
    /// Synthesize the research into an analysis
    Analyze,
    /// Score the analysis against the quality checklist
    Validate,
    /// Rework the analysis in depth after a low score
    RefineMajor,
    /// Polish the analysis after a near-threshold score
    RefineMinor,
}

impl Action {
    /// Stage key used in results, logs, and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Research => "research",
            Action::Analyze => "analyze",
            Action::Validate => "validate",
            Action::RefineMajor => "refine_major",
            Action::RefineMinor => "refine_minor",
        }
    }

    /// Refinement actions rework an analysis that scored below threshold.
    pub fn is_refinement(&self) -> bool {
        matches!(self, Action::RefineMajor | Action::RefineMinor)
    }

    /// Actions whose output lands in the analysis slot.
    pub fn writes_analysis(&self) -> bool {
        matches!(self, Action::Analyze | Action::RefineMajor | Action::RefineMinor)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_keys() {
        assert_eq!(Action::Research.as_str(), "research");
        assert_eq!(Action::RefineMajor.as_str(), "refine_major");
        assert_eq!(Action::RefineMinor.to_string(), "refine_minor");
    }

    #[test]
    fn test_refinement_classification() {
        assert!(Action::RefineMajor.is_refinement());
        assert!(Action::RefineMinor.is_refinement());
        assert!(!Action::Analyze.is_refinement());
        assert!(!Action::Validate.is_refinement());
    }

    #[test]
    fn test_writes_analysis() {
        assert!(Action::Analyze.writes_analysis());
        assert!(Action::RefineMajor.writes_analysis());
        assert!(!Action::Research.writes_analysis());
        assert!(!Action::Validate.writes_analysis());
    }

    #[test]
    fn test_serde_rename() {
        let json = serde_json::to_string(&Action::RefineMajor).unwrap();
        assert_eq!(json, "\"refine_major\"");
        let action: Action = serde_json::from_str("\"validate\"").unwrap();
        assert_eq!(action, Action::Validate);
    }
}
