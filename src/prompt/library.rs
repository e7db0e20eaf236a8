//! Named prompt templates for each agent role.
//!
//! Templates declare their variables up front; rendering fails fast when
//! a caller forgets one instead of silently emitting a hole.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{QuestorError, Result};
use crate::llm::GenerationConstraints;

use super::render::PromptRenderer;

/// A named, versioned prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub template: String,
    /// Variables that must be present in the render context.
    pub variables: Vec<String>,
    /// Agent role this prompt addresses.
    pub role: String,
    /// Generation parameters to use with this prompt.
    pub constraints: GenerationConstraints,
}

/// Registry of prompt templates, seeded with the built-in agent prompts.
pub struct PromptLibrary {
    templates: HashMap<String, PromptTemplate>,
    renderer: PromptRenderer,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptLibrary {
    /// Create a library with the built-in prompts registered.
    pub fn new() -> Self {
        let mut library = Self {
            templates: HashMap::new(),
            renderer: PromptRenderer::new(),
        };

        for template in builtin_templates() {
            // Built-ins are static and well-formed
            library.register(template).expect("built-in template must register");
        }

        library
    }

    /// Register a template, making it renderable by name.
    pub fn register(&mut self, template: PromptTemplate) -> Result<()> {
        self.renderer.register_template(&template.name, &template.template)?;
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Render a template, validating that every declared variable is
    /// present in the context.
    pub fn render(&self, name: &str, context: &HashMap<String, String>) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| QuestorError::Prompt(format!("unknown template: {}", name)))?;

        let missing: Vec<&str> = template
            .variables
            .iter()
            .filter(|v| !context.contains_key(v.as_str()))
            .map(|v| v.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(QuestorError::Prompt(format!(
                "template '{}' missing variables: {}",
                name,
                missing.join(", ")
            )));
        }

        self.renderer.render_named(name, context)
    }

    /// Names of all registered templates, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn builtin_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate {
            name: "researcher_query".to_string(),
            version: "1.0.0".to_string(),
            template: "\
You are a research assistant tasked with gathering information.

BOUNDARIES:
- Focus ONLY on: {{allowed_topics}}
- DO NOT provide advice on: {{forbidden_topics}}
- Maximum response length: {{max_length}} words

TASK: Research the following topic and provide key findings:
Topic: {{topic}}

Requirements:
1. Provide factual, verifiable information
2. Include 3-5 key points
3. Be concise and structured
4. Cite reasoning where applicable

Response:"
                .to_string(),
            variables: vec![
                "topic".to_string(),
                "allowed_topics".to_string(),
                "forbidden_topics".to_string(),
                "max_length".to_string(),
            ],
            role: "researcher".to_string(),
            constraints: GenerationConstraints::new().with_temperature(0.3).with_max_tokens(500),
        },
        PromptTemplate {
            name: "analyzer_synthesis".to_string(),
            version: "1.0.0".to_string(),
            template: "\
You are an analytical assistant that synthesizes information.

ROLE: Analyze and synthesize the provided research findings.

INPUT RESEARCH:
{{research_data}}

ANALYSIS REQUIREMENTS:
1. Identify main themes and patterns
2. Highlight key insights (2-4 insights)
3. Note any contradictions or gaps
4. Provide a coherent summary

Constraints:
- Be objective and analytical
- Maximum {{max_length}} words
- Focus on synthesis, not repetition

Analysis:"
                .to_string(),
            variables: vec!["research_data".to_string(), "max_length".to_string()],
            role: "analyzer".to_string(),
            constraints: GenerationConstraints::new().with_temperature(0.2).with_max_tokens(500),
        },
        PromptTemplate {
            name: "validator_check".to_string(),
            version: "1.0.0".to_string(),
            template: "\
You are a quality validation assistant.

ROLE: Validate the quality and accuracy of the analysis.

ANALYSIS TO VALIDATE:
{{analysis}}

VALIDATION CHECKLIST:
1. Logical consistency: Are the conclusions logical?
2. Completeness: Does it address the original query?
3. Clarity: Is it clear and well-structured?
4. Factual accuracy: Are claims reasonable and supported?

Provide validation results in this format:
- Logical Consistency: [PASS/FAIL] - [brief reason]
- Completeness: [PASS/FAIL] - [brief reason]
- Clarity: [PASS/FAIL] - [brief reason]
- Factual Accuracy: [PASS/FAIL] - [brief reason]
- Overall Quality Score: [0-100]
- Recommendation: [APPROVE/REVISE/REJECT]

Validation Result:"
                .to_string(),
            variables: vec!["analysis".to_string()],
            role: "validator".to_string(),
            constraints: GenerationConstraints::new().with_temperature(0.1).with_max_tokens(300),
        },
        PromptTemplate {
            name: "refine_major".to_string(),
            version: "1.0.0".to_string(),
            template: "\
You are an analytical assistant performing refinement.

ORIGINAL RESEARCH:
{{research_data}}

PREVIOUS ANALYSIS (Quality Score: {{quality_score}} - BELOW THRESHOLD):
{{analysis}}

TASK: Provide a DEEPER, MORE DETAILED analysis:
1. Add more specific insights
2. Include concrete examples
3. Provide more thorough synthesis
4. Elaborate on key themes

Refined Analysis:"
                .to_string(),
            variables: vec![
                "research_data".to_string(),
                "analysis".to_string(),
                "quality_score".to_string(),
            ],
            role: "analyzer_refinement".to_string(),
            constraints: GenerationConstraints::new().with_temperature(0.3).with_max_tokens(600),
        },
        PromptTemplate {
            name: "refine_minor".to_string(),
            version: "1.0.0".to_string(),
            template: "\
You are an analytical assistant performing minor refinement.

ANALYSIS (Quality Score: {{quality_score}} - Close to threshold):
{{analysis}}

TASK: Make small improvements:
1. Clarify any ambiguous points
2. Strengthen conclusions
3. Improve structure slightly

Refined Analysis:"
                .to_string(),
            variables: vec!["analysis".to_string(), "quality_score".to_string()],
            role: "analyzer_minor_refine".to_string(),
            constraints: GenerationConstraints::new().with_temperature(0.2).with_max_tokens(400),
        },
    ]
}
