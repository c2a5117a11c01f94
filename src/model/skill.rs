use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::model::types::{ActivityType, ProgressEntry, SkillLevel, TimeOfDay, UserProfile};

const CONFIDENCE_BASE_RATIO: f64 = 0.8;
const CONFIDENCE_BONUS_PER_ASSESSMENT: f64 = 0.02;
const CONFIDENCE_BONUS_CAP: f64 = 0.2;
const MIN_SESSION_MINUTES: u32 = 5;
const MAX_SESSION_MINUTES: u32 = 180;
const DEFAULT_BEST_HOUR: u32 = 9;

pub fn is_valid_mastery(level: f64) -> bool {
    level.is_finite() && (0.0..=1.0).contains(&level)
}

pub fn is_valid_session_length(minutes: u32) -> bool {
    (MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes)
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

pub fn validate_profile(profile: &UserProfile) -> Result<(), String> {
    if profile.id.trim().is_empty() {
        return Err("user id must not be empty".to_string());
    }
    if !is_valid_email(&profile.email) {
        return Err(format!("invalid email: {}", profile.email));
    }
    if !is_valid_session_length(profile.preferences.session_length) {
        return Err(format!(
            "session length must be between {MIN_SESSION_MINUTES} and {MAX_SESSION_MINUTES} minutes"
        ));
    }
    if let Some(skill) = profile
        .skill_levels
        .values()
        .find(|skill| !is_valid_mastery(skill.mastery) || !is_valid_mastery(skill.confidence))
    {
        return Err(format!("skill level out of range for {}", skill.concept));
    }
    Ok(())
}

pub fn initial_skill_level(concept: &str) -> SkillLevel {
    SkillLevel {
        concept: concept.to_string(),
        mastery: 0.0,
        confidence: 0.0,
        last_assessed: Utc::now(),
        assessment_count: 0,
    }
}

/// 80% of mastery plus 0.02 per prior assessment (bonus capped at 0.2).
pub fn assessment_confidence(mastery: f64, existing: Option<&SkillLevel>) -> f64 {
    let base = mastery * CONFIDENCE_BASE_RATIO;
    match existing {
        Some(skill) => {
            let bonus = (skill.assessment_count as f64 * CONFIDENCE_BONUS_PER_ASSESSMENT)
                .min(CONFIDENCE_BONUS_CAP);
            (base + bonus).min(1.0)
        }
        None => base,
    }
}

/// Writes a new assessment into the map, clamping both scales and bumping
/// the assessment counter.
pub fn apply_assessment(
    skill_levels: &mut HashMap<String, SkillLevel>,
    concept: &str,
    mastery: f64,
    confidence: f64,
    now: DateTime<Utc>,
) -> SkillLevel {
    let mastery = mastery.clamp(0.0, 1.0);
    let confidence = confidence.clamp(0.0, 1.0);

    let updated = match skill_levels.get(concept) {
        Some(existing) => SkillLevel {
            mastery,
            confidence,
            last_assessed: now,
            assessment_count: existing.assessment_count.saturating_add(1),
            ..existing.clone()
        },
        None => SkillLevel {
            concept: concept.to_string(),
            mastery,
            confidence,
            last_assessed: now,
            assessment_count: 1,
        },
    };

    skill_levels.insert(concept.to_string(), updated.clone());
    updated
}

pub fn overall_mastery(skill_levels: &HashMap<String, SkillLevel>) -> f64 {
    if skill_levels.is_empty() {
        return 0.0;
    }
    let total: f64 = skill_levels.values().map(|skill| skill.mastery).sum();
    total / skill_levels.len() as f64
}

/// Orders `(concept, mastery)` pairs by mastery, ties by name, and keeps the
/// first `limit` names.
pub fn rank_by_mastery<'a, I>(entries: I, limit: usize, descending: bool) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, f64)>,
{
    let mut entries: Vec<(&String, f64)> = entries.into_iter().collect();
    entries.sort_by(|(a_name, a), (b_name, b)| {
        let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        let ord = if descending { ord.reverse() } else { ord };
        ord.then_with(|| a_name.cmp(b_name))
    });
    entries
        .into_iter()
        .take(limit)
        .map(|(concept, _)| concept.clone())
        .collect()
}

fn ranked_concepts(
    skill_levels: &HashMap<String, SkillLevel>,
    limit: usize,
    descending: bool,
) -> Vec<String> {
    rank_by_mastery(
        skill_levels
            .iter()
            .map(|(concept, skill)| (concept, skill.mastery)),
        limit,
        descending,
    )
}

pub fn weakest_concepts(skill_levels: &HashMap<String, SkillLevel>, limit: usize) -> Vec<String> {
    ranked_concepts(skill_levels, limit, false)
}

pub fn strongest_concepts(skill_levels: &HashMap<String, SkillLevel>, limit: usize) -> Vec<String> {
    ranked_concepts(skill_levels, limit, true)
}

pub fn recent_progress(
    history: &[ProgressEntry],
    days: i64,
    now: DateTime<Utc>,
) -> Vec<&ProgressEntry> {
    let cutoff = now - Duration::days(days);
    history
        .iter()
        .filter(|entry| entry.timestamp >= cutoff)
        .collect()
}

/// Distinct concepts touched per day over the trailing week.
pub fn progress_velocity(history: &[ProgressEntry], now: DateTime<Utc>) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let mut concepts: Vec<&str> = recent_progress(history, 7, now)
        .into_iter()
        .map(|entry| entry.concept.as_str())
        .collect();
    concepts.sort_unstable();
    concepts.dedup();
    concepts.len() as f64 / 7.0
}

/// Hour of day (UTC) whose samples have the highest mean accuracy. Ties keep
/// the earliest hour.
pub fn best_hour<I>(samples: I) -> Option<u32>
where
    I: IntoIterator<Item = (u32, f64)>,
{
    let mut buckets: [(f64, u32); 24] = [(0.0, 0); 24];
    let mut any = false;
    for (hour, accuracy) in samples {
        let slot = &mut buckets[(hour % 24) as usize];
        slot.0 += accuracy;
        slot.1 += 1;
        any = true;
    }
    if !any {
        return None;
    }

    let mut best: Option<(u32, f64)> = None;
    for (hour, (sum, count)) in buckets.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let mean = sum / *count as f64;
        if best.is_none_or(|(_, best_mean)| mean > best_mean) {
            best = Some((hour as u32, mean));
        }
    }
    best.map(|(hour, _)| hour)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPatterns {
    pub best_time_of_day: TimeOfDay,
    /// Minutes.
    pub average_session_length: u32,
    pub preferred_activity_type: ActivityType,
}

impl Default for LearningPatterns {
    fn default() -> Self {
        Self {
            best_time_of_day: TimeOfDay::Morning,
            average_session_length: 30,
            preferred_activity_type: ActivityType::ExplanationViewed,
        }
    }
}

pub fn identify_learning_patterns(history: &[ProgressEntry]) -> LearningPatterns {
    if history.is_empty() {
        return LearningPatterns::default();
    }

    let hour = best_hour(
        history
            .iter()
            .map(|entry| (entry.timestamp.hour(), entry.performance.accuracy)),
    )
    .unwrap_or(DEFAULT_BEST_HOUR);

    let total_secs: u64 = history.iter().map(|entry| entry.activity.duration).sum();
    let average_session_length = (total_secs as f64 / history.len() as f64 / 60.0).round() as u32;

    let mut counts: Vec<(ActivityType, usize)> = Vec::new();
    for entry in history {
        match counts
            .iter_mut()
            .find(|(kind, _)| *kind == entry.activity.activity_type)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.activity.activity_type, 1)),
        }
    }
    // first-seen type wins ties
    let preferred_activity_type = counts
        .iter()
        .fold(None::<(ActivityType, usize)>, |best, &(kind, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((kind, count)),
        })
        .map(|(kind, _)| kind)
        .unwrap_or(ActivityType::ExplanationViewed);

    LearningPatterns {
        best_time_of_day: TimeOfDay::from_hour(hour),
        average_session_length,
        preferred_activity_type,
    }
}
