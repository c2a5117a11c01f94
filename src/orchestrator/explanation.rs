use serde::{Deserialize, Serialize};

use crate::content::{CodeExample, ContentGenerator, DiagramData};
use crate::model::types::{ConceptNode, DifficultyLevel, LearningStyle, SkillLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationContent {
    pub summary: String,
    pub detailed: String,
    pub examples: Vec<CodeExample>,
    pub analogies: Vec<String>,
    pub step_by_step: Vec<String>,
    pub visual_aids: Vec<DiagramData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub id: String,
    pub concept: String,
    pub target_level: DifficultyLevel,
    pub content: ExplanationContent,
    pub prerequisites: Vec<String>,
    pub next_steps: Vec<String>,
    /// Minutes.
    pub estimated_read_time: u32,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub concept: String,
    pub user_level: SkillLevel,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub preferred_style: Option<LearningStyle>,
    #[serde(default = "default_true")]
    pub include_examples: bool,
    #[serde(default = "default_true")]
    pub include_analogies: bool,
}

impl ExplanationRequest {
    pub fn new(concept: impl Into<String>, user_level: SkillLevel) -> Self {
        Self {
            concept: concept.into(),
            user_level,
            context: None,
            preferred_style: None,
            include_examples: true,
            include_analogies: true,
        }
    }
}

pub(crate) fn build(
    generator: &ContentGenerator,
    node: &ConceptNode,
    level: &SkillLevel,
    complexity: DifficultyLevel,
) -> Explanation {
    let concept = node.id.as_str();
    Explanation {
        id: format!("explanation-{concept}-{}", uuid::Uuid::new_v4()),
        concept: concept.to_string(),
        target_level: complexity,
        content: ExplanationContent {
            summary: generator.summary(concept, complexity),
            detailed: generator.detailed(concept, complexity),
            examples: vec![generator.example(concept, complexity)],
            analogies: vec![generator.analogy(concept, complexity)],
            step_by_step: generator.step_by_step(concept, complexity),
            visual_aids: vec![generator.diagram(concept, complexity)],
        },
        prerequisites: node.prerequisites.clone(),
        next_steps: next_steps(concept, level.mastery),
        estimated_read_time: read_time(complexity),
    }
}

/// Applies the per-request options to an owned copy.
pub(crate) fn apply_request_options(mut explanation: Explanation, request: &ExplanationRequest) -> Explanation {
    if let Some(style) = request.preferred_style {
        let content = &mut explanation.content;
        content.detailed = match style {
            LearningStyle::Visual => format!("Visual learner focus: {}", content.detailed),
            LearningStyle::Auditory => format!("Listen carefully: {}", content.detailed),
            LearningStyle::Kinesthetic => format!("Hands-on approach: {}", content.detailed),
            LearningStyle::Mixed => std::mem::take(&mut content.detailed),
        };
    }
    if !request.include_examples {
        explanation.content.examples.clear();
    }
    if !request.include_analogies {
        explanation.content.analogies.clear();
    }
    explanation
}

fn next_steps(concept: &str, mastery: f64) -> Vec<String> {
    if mastery < 0.5 {
        vec![
            format!("Practice more {concept} exercises"),
            "Review prerequisite concepts".to_string(),
        ]
    } else if mastery < 0.8 {
        vec![
            format!("Explore advanced {concept} topics"),
            format!("Apply {concept} to projects"),
        ]
    } else {
        vec![
            format!("Teach {concept} to others"),
            format!("Contribute to {concept} community"),
        ]
    }
}

fn read_time(level: DifficultyLevel) -> u32 {
    match level {
        DifficultyLevel::Beginner => 5,
        DifficultyLevel::Intermediate => 8,
        DifficultyLevel::Advanced => 12,
        DifficultyLevel::Expert => 15,
    }
}
