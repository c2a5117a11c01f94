use crate::model::types::{DifficultyLevel, DifficultyPreference, LearningStyle, UserPreferences};

use super::types::{LearningMaterial, MaterialType, PersonalizationModel, PersonalizedContent};

const PARAGRAPH_CUE: &str = "\n\nNow, let's move on to the next point.\n\n";
const SENTENCE_CUE: &str = " Take a moment to consider this.";

/// Adapts a copy of `material` for the learner's style, skill and
/// preferences. The original is returned untouched alongside the copy.
pub fn personalize(model: &PersonalizationModel, material: &LearningMaterial) -> PersonalizedContent {
    let mut adapted = material.clone();
    let mut reasons = Vec::new();

    adapt_for_style(&mut adapted, model.learning_style, &mut reasons);
    adapt_for_skill(&mut adapted, model, &mut reasons);
    adapt_for_preferences(&mut adapted, &model.preferences, &mut reasons);

    PersonalizedContent {
        original_content: material.clone(),
        adapted_content: adapted,
        adaptation_reasons: reasons,
        personalized_for: model.user_id.clone(),
    }
}

fn adapt_for_style(content: &mut LearningMaterial, style: LearningStyle, reasons: &mut Vec<String>) {
    match style {
        LearningStyle::Visual => {
            if !content.content.diagrams.is_empty() {
                reasons.push("Enhanced visual elements for visual learner".to_string());
            }
            if !content.content.code.is_empty() {
                for example in &mut content.content.code {
                    if !example.explanation.contains("visual") {
                        example.explanation = format!("Visual breakdown: {}", example.explanation);
                    }
                }
                reasons.push("Added visual code explanations".to_string());
            }
        }
        LearningStyle::Auditory => {
            if let Some(text) = content.content.text.as_mut() {
                *text = with_verbal_cues(text);
                reasons.push("Enhanced explanations for auditory learning".to_string());
            }
        }
        LearningStyle::Kinesthetic => {
            if !content.content.interactive.is_empty() {
                reasons.push("Prioritized interactive elements for hands-on learning".to_string());
            }
            if content.material_type == MaterialType::Explanation {
                push_tag(content, "hands-on-recommended");
                reasons.push("Recommended hands-on practice".to_string());
            }
        }
        LearningStyle::Mixed => {
            reasons.push("Balanced multi-modal content presentation".to_string());
        }
    }
}

fn adapt_for_skill(
    content: &mut LearningMaterial,
    model: &PersonalizationModel,
    reasons: &mut Vec<String>,
) {
    let known: Vec<f64> = content
        .concepts
        .iter()
        .filter_map(|concept| model.skill_levels.get(concept).copied())
        .collect();
    if known.is_empty() {
        return;
    }
    let average = known.iter().sum::<f64>() / known.len() as f64;

    if average < 0.3 && content.difficulty != DifficultyLevel::Beginner {
        content.difficulty = DifficultyLevel::Beginner;
        reasons.push("Simplified content for current skill level".to_string());
    } else if average > 0.8 && content.difficulty == DifficultyLevel::Beginner {
        content.difficulty = DifficultyLevel::Intermediate;
        reasons.push("Increased complexity for advanced skill level".to_string());
    }

    if average < 0.5 && !content.prerequisites.is_empty() {
        let reminder = format!("Prerequisites reminder: {}", content.prerequisites.join(", "));
        if let Some(text) = content.content.text.as_mut() {
            *text = format!("{reminder}\n\n{text}");
            reasons.push("Added prerequisite reminders".to_string());
        }
    }
}

fn adapt_for_preferences(
    content: &mut LearningMaterial,
    preferences: &UserPreferences,
    reasons: &mut Vec<String>,
) {
    if content.metadata.estimated_time > preferences.session_length {
        push_tag(content, "break-recommended");
        reasons.push("Recommended breaks for long content".to_string());
    }

    match (preferences.difficulty_preference, content.difficulty) {
        (DifficultyPreference::Challenging, DifficultyLevel::Beginner) => {
            push_tag(content, "challenge-mode");
            reasons.push("Enhanced for challenge preference".to_string());
        }
        (DifficultyPreference::Comfortable, DifficultyLevel::Advanced) => {
            push_tag(content, "comfort-mode");
            reasons.push("Simplified for comfort preference".to_string());
        }
        _ => {}
    }
}

fn push_tag(content: &mut LearningMaterial, tag: &str) {
    if !content.metadata.tags.iter().any(|t| t == tag) {
        content.metadata.tags.push(tag.to_string());
    }
}

/// Paragraph transitions plus a pause after each sentence.
fn with_verbal_cues(text: &str) -> String {
    text.split("\n\n")
        .map(|paragraph| {
            let mut out = String::with_capacity(paragraph.len() * 2);
            let mut chars = paragraph.chars().peekable();
            while let Some(c) = chars.next() {
                out.push(c);
                let ends_sentence = matches!(c, '.' | '!' | '?')
                    && chars.peek().is_none_or(|next| next.is_whitespace());
                if ends_sentence {
                    out.push_str(SENTENCE_CUE);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(PARAGRAPH_CUE)
}
