//! System configuration.
//!
//! Loaded from an explicit path, ./questor.yml, or ~/.config/questor/questor.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::GenerationConstraints;

/// Top-level configuration for Questor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// System identity, echoed in logs and system info.
    pub system: SystemInfo,

    /// Generation backend transport settings.
    pub llm: LlmSettings,

    /// Topic boundaries enforced before any workflow runs.
    pub boundaries: Boundaries,

    /// Per-role generation profiles, keyed by agent role.
    pub agents: HashMap<String, GenerationConstraints>,

    /// Quality and performance requirements.
    pub requirements: Requirements,

    /// Workflow loop settings.
    pub workflow: WorkflowSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemInfo::default(),
            llm: LlmSettings::default(),
            boundaries: Boundaries::default(),
            agents: default_agents(),
            requirements: Requirements::default(),
            workflow: WorkflowSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. questor.yml in current directory
    /// 3. ~/.config/questor/questor.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project config
        let project_config = PathBuf::from("questor.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from questor.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load questor.yml: {}", e);
                }
            }
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("questor").join("questor.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_attempts == 0 {
            eyre::bail!("workflow.max_attempts must be > 0");
        }
        if self.llm.timeout_ms == 0 {
            eyre::bail!("llm.timeout_ms must be > 0");
        }
        let threshold = self.requirements.non_functional.min_accuracy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            eyre::bail!("requirements.non_functional.min_accuracy_threshold must be in [0, 1]");
        }
        Ok(())
    }

    /// Quality threshold that gates successful completion.
    pub fn quality_threshold(&self) -> f64 {
        self.requirements.non_functional.min_accuracy_threshold
    }
}

/// System identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            name: "questor".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Model used when a role profile names none.
    pub default_model: String,

    /// Per-call deadline in milliseconds. Calls exceeding it are aborted
    /// and surface as a timeout failure.
    pub timeout_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4.1-mini".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Topic boundaries for the pre-loop classification check.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Boundaries {
    pub allowed_topics: Vec<String>,
    pub forbidden_topics: Vec<String>,
}

impl Default for Boundaries {
    fn default() -> Self {
        Self {
            allowed_topics: vec![
                "technology".to_string(),
                "business strategy".to_string(),
                "finance".to_string(),
            ],
            forbidden_topics: vec![
                "medical advice".to_string(),
                "legal advice".to_string(),
                "weapons".to_string(),
            ],
        }
    }
}

/// Functional and non-functional requirements.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Requirements {
    pub non_functional: NonFunctionalRequirements,
}

/// Non-functional thresholds checked after each workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NonFunctionalRequirements {
    /// Minimum validated quality for a workflow to count as accurate.
    pub min_accuracy_threshold: f64,

    /// Maximum acceptable total latency per workflow.
    pub max_latency_ms: f64,

    /// Minimum stage success rate.
    pub min_reliability_threshold: f64,
}

impl Default for NonFunctionalRequirements {
    fn default() -> Self {
        Self {
            min_accuracy_threshold: 0.75,
            max_latency_ms: 10_000.0,
            min_reliability_threshold: 0.95,
        }
    }
}

/// Loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Attempt budget per workflow.
    pub max_attempts: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

fn default_agents() -> HashMap<String, GenerationConstraints> {
    let mut agents = HashMap::new();
    agents.insert(
        "researcher".to_string(),
        GenerationConstraints::new().with_temperature(0.3).with_max_tokens(500),
    );
    agents.insert(
        "analyzer".to_string(),
        GenerationConstraints::new().with_temperature(0.2).with_max_tokens(500),
    );
    agents.insert(
        "validator".to_string(),
        GenerationConstraints::new().with_temperature(0.1).with_max_tokens(300),
    );
    agents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow.max_attempts, 5);
        assert!((config.quality_threshold() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_agents_present() {
        let config = Config::default();
        for role in ["researcher", "analyzer", "validator"] {
            assert!(config.agents.contains_key(role), "missing profile for {}", role);
        }
        let validator = &config.agents["validator"];
        assert_eq!(validator.temperature, Some(0.1));
        assert_eq!(validator.max_tokens, Some(300));
    }

    #[test]
    fn test_parse_partial_yaml_uses_defaults() {
        let yaml = r#"
workflow:
  max_attempts: 3
requirements:
  non_functional:
    min_accuracy_threshold: 0.8
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workflow.max_attempts, 3);
        assert!((config.quality_threshold() - 0.8).abs() < f64::EPSILON);
        // Untouched sections fall back to defaults
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert!(!config.boundaries.forbidden_topics.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.workflow.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.requirements.non_functional.min_accuracy_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored.workflow.max_attempts, config.workflow.max_attempts);
        assert_eq!(restored.llm.base_url, config.llm.base_url);
    }
}
