//! Keyword-driven tutor replies. Deterministic pattern matching only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ChatResponse {
    pub(crate) fn new(message: impl Into<String>, suggestions: &[&str]) -> Self {
        Self {
            message: message.into(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatIntent {
    Greeting,
    /// Carries the subject left after the trigger phrase, if any.
    Explain(Option<String>),
    Progress,
    Help,
    Other,
}

const GREETINGS: [&str; 3] = ["hello", "hi", "hey"];

/// First matching rule wins: greeting, explain, progress, help.
pub fn classify(message: &str) -> ChatIntent {
    let lower = message.to_lowercase();

    let is_greeting = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETINGS.contains(&word));
    if is_greeting {
        return ChatIntent::Greeting;
    }

    if lower.contains("explain") || lower.contains("what is") {
        let term = lower
            .replacen("explain", "", 1)
            .replacen("what is", "", 1)
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        return ChatIntent::Explain((!term.is_empty()).then_some(term));
    }

    if lower.contains("progress") || lower.contains("how am i doing") {
        return ChatIntent::Progress;
    }

    if lower.contains("help") {
        return ChatIntent::Help;
    }

    ChatIntent::Other
}

pub(crate) fn greeting() -> ChatResponse {
    ChatResponse::new(
        "Hello! I'm your tutor. I can help you with your learning path, explain concepts, or review your progress. What would you like to do?",
        &["Explain a concept", "Review my progress", "Start a quiz"],
    )
}

pub(crate) fn explanation_found(summary: &str) -> ChatResponse {
    ChatResponse::new(
        format!("{summary}\n\nWould you like a more detailed explanation or an example?"),
        &["Detailed explanation", "Show example", "Compare with..."],
    )
}

pub(crate) fn unknown_concept(term: &str) -> ChatResponse {
    ChatResponse::new(
        format!(
            "I'm not sure about \"{term}\". I can explain topics like \"React\", \"TypeScript\", \"Node.js\", or \"Databases\"."
        ),
        &["What is React?", "Explain TypeScript"],
    )
}

pub(crate) fn explain_prompt() -> ChatResponse {
    ChatResponse::new(
        "I can explain many concepts. Try asking about specific topics like \"React\", \"TypeScript\", or \"Databases\".",
        &["What is React?", "Explain TypeScript interfaces"],
    )
}

pub(crate) fn progress(velocity: f64, strengths: &[String], weaknesses: &[String]) -> ChatResponse {
    let pace = if velocity > 0.0 { "steady" } else { "getting started" };
    let strong = if strengths.is_empty() {
        "basics".to_string()
    } else {
        strengths.join(", ")
    };
    let weak = if weaknesses.is_empty() {
        "advanced topics".to_string()
    } else {
        weaknesses.join(", ")
    };
    ChatResponse::new(
        format!(
            "You're making good progress! Your learning velocity is {pace}. You are strong in {strong} but could focus more on {weak}."
        ),
        &["View full detailed report", "Practice weak areas"],
    )
}

pub(crate) fn help() -> ChatResponse {
    ChatResponse::new(
        "I can help you learn new concepts, practice skills, and track your progress. Try asking 'What is TypeScript?' or 'Start a quiz'.",
        &["Start a new session", "Explain a concept"],
    )
}

pub(crate) fn clarify(context: Option<&ChatContext>) -> ChatResponse {
    let topic = context
        .and_then(|ctx| ctx.topic.as_deref())
        .unwrap_or("learning");
    ChatResponse::new(
        format!(
            "I understand. That's an interesting point about {topic}. Could you elaborate or ask a specific question?"
        ),
        &["Tell me more", "Give an example", "Next topic"],
    )
}
