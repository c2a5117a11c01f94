use std::sync::Arc;

use chrono::{Duration, Timelike, Utc};
use tracing::{debug, info};

use crate::cache::keys;
use crate::error::{LearningError, LearningResult};
use crate::model::skill;
use crate::model::thresholds::DifficultyPolicy;
use crate::model::types::{
    DifficultyLevel, DifficultyPreference, LearningStyle, PerformanceMetrics, SessionMetrics,
    TimeOfDay, UserPreferences,
};
use crate::storage::{KeyedLocks, PersonalizationStore};

use super::personalize;
use super::types::{
    DifficultyAdjustment, EngineInsights, LearningMaterial, LearningPrediction,
    PacingRecommendation, PerformanceData, PersonalizationModel, PersonalizedContent,
};

const RECENT_WINDOW: usize = 10;
const DEFAULT_ACCURACY: f64 = 0.5;
const DEFAULT_VELOCITY: f64 = 0.1;
const MAX_TIME_TO_MASTERY_HOURS: f64 = 100.0;
const INSIGHT_LIST_LIMIT: usize = 5;

const EXCELLENT_ACCURACY: f64 = 0.9;
const GOOD_ACCURACY: f64 = 0.75;
const POOR_ACCURACY: f64 = 0.4;
const STREAK_ACCURACY: f64 = 0.7;
const STREAK_LENGTH: usize = 5;

/// Per-learner adaptation: difficulty, prediction, pacing, insights and
/// content personalization. Each learner's record is read, changed and
/// written back under that learner's lock.
pub struct PersonalizationEngine {
    store: Arc<dyn PersonalizationStore>,
    locks: KeyedLocks,
    policy: Arc<DifficultyPolicy>,
    history_cap: usize,
}

impl PersonalizationEngine {
    pub fn new(
        store: Arc<dyn PersonalizationStore>,
        policy: Arc<DifficultyPolicy>,
        history_cap: usize,
    ) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            policy,
            history_cap: history_cap.max(1),
        }
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    async fn load_or_init(&self, user_id: &str) -> LearningResult<PersonalizationModel> {
        match self.store.load(user_id).await? {
            Some(model) => Ok(model),
            None => {
                debug!(user_id = %user_id, "Initializing personalization model");
                Ok(PersonalizationModel::new(user_id))
            }
        }
    }

    /// Runs `f` against the learner's record and persists the result.
    async fn with_model<R, F>(&self, user_id: &str, f: F) -> LearningResult<R>
    where
        F: FnOnce(&mut PersonalizationModel) -> R + Send,
        R: Send,
    {
        let _guard = self.locks.acquire(&keys::user_lock_key(user_id)).await;
        let mut model = self.load_or_init(user_id).await?;
        let result = f(&mut model);
        model.last_active = Utc::now();
        self.store.save(model).await?;
        Ok(result)
    }

    pub async fn get_or_create_model(&self, user_id: &str) -> LearningResult<PersonalizationModel> {
        self.with_model(user_id, |model| model.clone()).await
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        learning_style: LearningStyle,
        preferences: UserPreferences,
    ) -> LearningResult<()> {
        self.with_model(user_id, move |model| {
            model.learning_style = learning_style;
            model.preferences = preferences;
        })
        .await
    }

    /// Merges scalar masteries into the engine's working copy.
    pub async fn sync_skill_levels<I>(&self, user_id: &str, levels: I) -> LearningResult<()>
    where
        I: IntoIterator<Item = (String, f64)> + Send,
        I::IntoIter: Send,
    {
        self.with_model(user_id, move |model| {
            for (concept, mastery) in levels {
                model.skill_levels.insert(concept, mastery.clamp(0.0, 1.0));
            }
        })
        .await
    }

    pub async fn record_performance(
        &self,
        user_id: &str,
        metrics: PerformanceMetrics,
    ) -> LearningResult<()> {
        if !skill::is_valid_mastery(metrics.accuracy) {
            return Err(LearningError::validation(format!(
                "accuracy {} is outside [0, 1]",
                metrics.accuracy
            )));
        }
        let cap = self.history_cap;
        self.with_model(user_id, move |model| model.push_performance(metrics, cap))
            .await
    }

    pub async fn adjust_difficulty(
        &self,
        user_id: &str,
        performance: &PerformanceData,
    ) -> LearningResult<DifficultyAdjustment> {
        let policy = Arc::clone(&self.policy);
        let concept = performance.concept.clone();

        let adjustment = self
            .with_model(user_id, move |model| {
                let adjustment = decide_adjustment(model, &policy, &concept);
                model
                    .skill_levels
                    .insert(concept, adjustment.to_level.approximate_mastery());
                adjustment
            })
            .await?;

        if adjustment.is_change() {
            info!(
                user_id = %user_id,
                concept = %performance.concept,
                from = %adjustment.from_level,
                to = %adjustment.to_level,
                confidence = adjustment.confidence,
                "Difficulty adjusted"
            );
        } else {
            debug!(user_id = %user_id, concept = %performance.concept, "Difficulty unchanged");
        }
        Ok(adjustment)
    }

    pub async fn predict_learning_outcome(
        &self,
        user_id: &str,
        concept: &str,
    ) -> LearningResult<LearningPrediction> {
        let model = self.get_or_create_model(user_id).await?;
        Ok(predict(&model, concept))
    }

    pub async fn optimize_pacing(
        &self,
        user_id: &str,
        metrics: &SessionMetrics,
    ) -> LearningResult<PacingRecommendation> {
        self.optimize_pacing_at(user_id, metrics, Utc::now().hour())
            .await
    }

    /// Same as [`optimize_pacing`](Self::optimize_pacing) with an explicit
    /// hour of day (0-23).
    pub async fn optimize_pacing_at(
        &self,
        user_id: &str,
        metrics: &SessionMetrics,
        hour: u32,
    ) -> LearningResult<PacingRecommendation> {
        let model = self.get_or_create_model(user_id).await?;
        Ok(pacing(model.preferences.session_length, metrics, hour))
    }

    pub async fn learning_insights(&self, user_id: &str) -> LearningResult<EngineInsights> {
        let model = self.get_or_create_model(user_id).await?;
        Ok(insights(&model))
    }

    pub async fn personalize_content(
        &self,
        user_id: &str,
        material: &LearningMaterial,
    ) -> LearningResult<PersonalizedContent> {
        let model = self.get_or_create_model(user_id).await?;
        Ok(personalize::personalize(&model, material))
    }

    /// Drops records idle for longer than `max_idle`; returns how many went.
    pub async fn cleanup_stale_models(&self, max_idle: Duration) -> usize {
        let removed = self.store.evict_idle(max_idle, Utc::now()).await;
        self.locks.prune();
        removed
    }

    pub async fn model_count(&self) -> usize {
        self.store.len().await
    }
}

fn average_accuracy(samples: &[&PerformanceMetrics]) -> f64 {
    if samples.is_empty() {
        return DEFAULT_ACCURACY;
    }
    samples.iter().map(|m| m.accuracy).sum::<f64>() / samples.len() as f64
}

/// Accuracy change per hour between the first and last sample.
fn learning_velocity(samples: &[&PerformanceMetrics]) -> f64 {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return DEFAULT_VELOCITY;
    };
    if samples.len() < 2 {
        return DEFAULT_VELOCITY;
    }
    let hours = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 3_600_000.0;
    if hours > 0.0 {
        (last.accuracy - first.accuracy) / hours
    } else {
        DEFAULT_VELOCITY
    }
}

fn decide_adjustment(
    model: &PersonalizationModel,
    policy: &DifficultyPolicy,
    concept: &str,
) -> DifficultyAdjustment {
    let current = policy.engine_level(model.mastery(concept));
    let average = average_accuracy(&model.recent(RECENT_WINDOW));

    let (to_level, reason, mut confidence) = if average >= EXCELLENT_ACCURACY {
        (
            current.harder(),
            "Excellent performance - increasing difficulty",
            0.9,
        )
    } else if average <= POOR_ACCURACY {
        (
            current.easier(),
            "Struggling with current level - decreasing difficulty",
            0.8,
        )
    } else if average >= GOOD_ACCURACY && model.trailing_streak(STREAK_ACCURACY) >= STREAK_LENGTH {
        (
            current.harder(),
            "Consistent good performance - ready for next level",
            0.7,
        )
    } else {
        (current, "Performance within current level range", 0.0)
    };

    match model.preferences.difficulty_preference {
        DifficultyPreference::Comfortable if to_level > current => confidence *= 0.8,
        DifficultyPreference::Challenging if to_level < current => confidence *= 0.9,
        _ => {}
    }

    DifficultyAdjustment {
        from_level: current,
        to_level,
        reason: reason.to_string(),
        confidence,
    }
}

fn recommended_path(concept: &str, mastery: f64) -> Vec<String> {
    let stages = ["basics", "intermediate", "advanced"];
    let skip = if mastery < 0.3 {
        0
    } else if mastery < 0.7 {
        1
    } else {
        2
    };
    stages[skip..]
        .iter()
        .map(|stage| format!("{concept}-{stage}"))
        .collect()
}

fn predict(model: &PersonalizationModel, concept: &str) -> LearningPrediction {
    let current = model.mastery(concept);
    let recent = model.recent(RECENT_WINDOW);
    let velocity = learning_velocity(&recent);

    let time_to_mastery = if velocity > 0.0 {
        ((1.0 - current) / velocity).clamp(0.0, MAX_TIME_TO_MASTERY_HOURS)
    } else {
        MAX_TIME_TO_MASTERY_HOURS
    };

    LearningPrediction {
        concept: concept.to_string(),
        predicted_mastery: (current + velocity * 0.1).clamp(0.0, 1.0),
        time_to_mastery,
        confidence: (recent.len() as f64 * 0.1).min(0.9),
        recommended_path: recommended_path(concept, current),
    }
}

fn pacing(preferred_length: u32, metrics: &SessionMetrics, hour: u32) -> PacingRecommendation {
    let engagement = metrics.engagement_score;
    let accuracy = metrics.average_accuracy;

    let mut length = preferred_length as f64;
    let mut break_frequency = 30.0_f64;
    let mut density = 1.0_f64;
    let mut reasons = Vec::new();

    if engagement < 0.5 {
        length = (length * 0.8).max(15.0);
        break_frequency = 20.0;
        density = 0.8;
        reasons.push("Reduced pacing due to low engagement".to_string());
    } else if engagement > 0.8 && accuracy > 0.8 {
        length = (length * 1.2).min(90.0);
        break_frequency = 45.0;
        density = 1.2;
        reasons.push("Increased pacing due to high engagement and accuracy".to_string());
    }

    if accuracy < 0.6 {
        density *= 0.7;
        break_frequency = break_frequency.min(25.0);
        reasons.push("Slowed pacing to improve comprehension".to_string());
    }

    if !(9..=20).contains(&hour) {
        length *= 0.9;
        reasons.push("Shortened session outside peak study hours".to_string());
    }

    if reasons.is_empty() {
        reasons.push("Maintaining current pacing".to_string());
    }

    PacingRecommendation {
        session_length: length.round() as u32,
        break_frequency: break_frequency.round() as u32,
        content_density: (density * 100.0).round() / 100.0,
        reasons,
    }
}

fn ranked_by_mastery<F>(model: &PersonalizationModel, keep: F, descending: bool) -> Vec<String>
where
    F: Fn(f64) -> bool,
{
    skill::rank_by_mastery(
        model
            .skill_levels
            .iter()
            .filter(|(_, mastery)| keep(**mastery))
            .map(|(concept, mastery)| (concept, *mastery)),
        INSIGHT_LIST_LIMIT,
        descending,
    )
}

fn insights(model: &PersonalizationModel) -> EngineInsights {
    let strengths = ranked_by_mastery(model, |m| m > 0.8, true);
    let weaknesses = ranked_by_mastery(model, |m| m < 0.4, false);

    let mut recommendations = Vec::new();
    match model.learning_style {
        LearningStyle::Visual => recommendations
            .push("Focus on diagram-rich content and visual explanations".to_string()),
        LearningStyle::Kinesthetic => recommendations
            .push("Prioritize hands-on exercises and interactive content".to_string()),
        _ => {}
    }

    let recent_accuracy = average_accuracy(&model.recent(RECENT_WINDOW));
    if recent_accuracy < 0.6 {
        recommendations.push("Consider reviewing prerequisite concepts".to_string());
        recommendations.push("Take more frequent breaks during study sessions".to_string());
    } else if recent_accuracy > 0.8 {
        recommendations.push("Ready to tackle more challenging material".to_string());
    }

    let history: Vec<&PerformanceMetrics> = model.performance_history.iter().collect();
    let best_hour = skill::best_hour(
        history
            .iter()
            .map(|metrics| (metrics.timestamp.hour(), metrics.accuracy)),
    );

    EngineInsights {
        strengths,
        weaknesses,
        recommendations,
        learning_velocity: learning_velocity(&history),
        optimal_study_time: best_hour.map_or(TimeOfDay::Morning, TimeOfDay::from_hour),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::InMemoryPersonalizationStore;
    use chrono::TimeZone;

    fn engine() -> PersonalizationEngine {
        PersonalizationEngine::new(
            Arc::new(InMemoryPersonalizationStore::new(64)),
            Arc::new(DifficultyPolicy::default()),
            100,
        )
    }

    fn metrics(accuracy: f64, minutes_ago: i64) -> PerformanceMetrics {
        PerformanceMetrics {
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            ..PerformanceMetrics::with_accuracy(accuracy)
        }
    }

    #[tokio::test]
    async fn test_lazy_model_defaults() {
        let engine = engine();
        let model = engine.get_or_create_model("u1").await.unwrap();
        assert_eq!(model.learning_style, LearningStyle::Mixed);
        assert_eq!(model.preferences.session_length, 30);
        assert_eq!(
            model.preferences.difficulty_preference,
            DifficultyPreference::Adaptive
        );
        assert!(model.performance_history.is_empty());
        assert_eq!(engine.model_count().await, 1);
    }

    #[tokio::test]
    async fn test_excellent_accuracy_raises_one_level() {
        let engine = engine();
        for _ in 0..10 {
            engine.record_performance("u1", metrics(0.95, 0)).await.unwrap();
        }
        let data = PerformanceData::new("closures", PerformanceMetrics::with_accuracy(0.95));
        let adjustment = engine.adjust_difficulty("u1", &data).await.unwrap();

        assert_eq!(adjustment.from_level, DifficultyLevel::Beginner);
        assert_eq!(adjustment.to_level, DifficultyLevel::Intermediate);
        assert_eq!(adjustment.confidence, 0.9);

        let model = engine.get_or_create_model("u1").await.unwrap();
        assert_eq!(model.mastery("closures"), 0.5);
    }

    #[tokio::test]
    async fn test_increase_saturates_at_expert() {
        let engine = engine();
        engine
            .sync_skill_levels("u1", vec![("closures".to_string(), 0.95)])
            .await
            .unwrap();
        for _ in 0..10 {
            engine.record_performance("u1", metrics(1.0, 0)).await.unwrap();
        }
        let data = PerformanceData::new("closures", PerformanceMetrics::with_accuracy(1.0));
        for _ in 0..3 {
            let adjustment = engine.adjust_difficulty("u1", &data).await.unwrap();
            assert_eq!(adjustment.to_level, DifficultyLevel::Expert);
        }
    }

    #[tokio::test]
    async fn test_struggling_lowers_and_challenging_scales() {
        let engine = engine();
        let prefs = UserPreferences {
            difficulty_preference: DifficultyPreference::Challenging,
            ..UserPreferences::default()
        };
        engine
            .update_preferences("u1", LearningStyle::Mixed, prefs)
            .await
            .unwrap();
        engine
            .sync_skill_levels("u1", vec![("closures".to_string(), 0.65)])
            .await
            .unwrap();
        engine.record_performance("u1", metrics(0.2, 0)).await.unwrap();

        let data = PerformanceData::new("closures", PerformanceMetrics::with_accuracy(0.2));
        let adjustment = engine.adjust_difficulty("u1", &data).await.unwrap();
        assert_eq!(adjustment.from_level, DifficultyLevel::Advanced);
        assert_eq!(adjustment.to_level, DifficultyLevel::Intermediate);
        assert!((adjustment.confidence - 0.72).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_streak_rule_needs_five() {
        let engine = engine();
        for accuracy in [0.5, 0.78, 0.78, 0.78, 0.78] {
            engine.record_performance("u1", metrics(accuracy, 0)).await.unwrap();
        }
        let data = PerformanceData::new("x", PerformanceMetrics::with_accuracy(0.8));
        // average 0.724 and streak 4
        assert!(!engine.adjust_difficulty("u1", &data).await.unwrap().is_change());

        for _ in 0..5 {
            engine.record_performance("u2", metrics(0.8, 0)).await.unwrap();
        }
        let adjustment = engine.adjust_difficulty("u2", &data).await.unwrap();
        assert_eq!(adjustment.to_level, DifficultyLevel::Intermediate);
        assert_eq!(adjustment.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_empty_history_leaves_level() {
        let engine = engine();
        let data = PerformanceData::new("x", PerformanceMetrics::with_accuracy(0.5));
        let adjustment = engine.adjust_difficulty("u1", &data).await.unwrap();
        assert!(!adjustment.is_change());
        assert_eq!(adjustment.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_history_never_exceeds_cap() {
        let engine = PersonalizationEngine::new(
            Arc::new(InMemoryPersonalizationStore::new(8)),
            Arc::new(DifficultyPolicy::default()),
            100,
        );
        for i in 0..130 {
            engine
                .record_performance("u1", metrics((i % 10) as f64 / 10.0, 0))
                .await
                .unwrap();
        }
        let model = engine.get_or_create_model("u1").await.unwrap();
        assert_eq!(model.performance_history.len(), 100);
        assert_eq!(model.performance_history.front().unwrap().accuracy, 0.0);
    }

    #[tokio::test]
    async fn test_prediction_defaults_and_path() {
        let engine = engine();
        let prediction = engine.predict_learning_outcome("u1", "closures").await.unwrap();
        assert!((prediction.predicted_mastery - 0.01).abs() < 1e-10);
        assert!((prediction.time_to_mastery - 10.0).abs() < 1e-10);
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.recommended_path.len(), 3);

        engine
            .sync_skill_levels("u1", vec![("closures".to_string(), 0.75)])
            .await
            .unwrap();
        engine.record_performance("u1", metrics(0.9, 120)).await.unwrap();
        engine.record_performance("u1", metrics(0.5, 0)).await.unwrap();
        let prediction = engine.predict_learning_outcome("u1", "closures").await.unwrap();
        assert_eq!(prediction.time_to_mastery, 100.0);
        assert_eq!(prediction.recommended_path, vec!["closures-advanced"]);
        assert!((prediction.confidence - 0.2).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_pacing_branches_are_cumulative() {
        let engine = engine();
        let low = SessionMetrics {
            engagement_score: 0.3,
            average_accuracy: 0.5,
            ..SessionMetrics::default()
        };
        let pacing = engine.optimize_pacing_at("u1", &low, 22).await.unwrap();
        // 30 * 0.8 = 24, then * 0.9 off-peak
        assert_eq!(pacing.session_length, 22);
        assert_eq!(pacing.break_frequency, 20);
        assert!((pacing.content_density - 0.56).abs() < 1e-10);
        assert_eq!(pacing.reasons.len(), 3);

        let high = SessionMetrics {
            engagement_score: 0.9,
            average_accuracy: 0.9,
            ..SessionMetrics::default()
        };
        let pacing = engine.optimize_pacing_at("u1", &high, 10).await.unwrap();
        assert_eq!(pacing.session_length, 36);
        assert_eq!(pacing.break_frequency, 45);
        assert_eq!(pacing.content_density, 1.2);

        let steady = SessionMetrics {
            engagement_score: 0.7,
            average_accuracy: 0.7,
            ..SessionMetrics::default()
        };
        let pacing = engine.optimize_pacing_at("u1", &steady, 12).await.unwrap();
        assert_eq!(pacing.session_length, 30);
        assert_eq!(pacing.reasons, vec!["Maintaining current pacing"]);
    }

    #[tokio::test]
    async fn test_insights_thresholds() {
        let engine = engine();
        engine
            .sync_skill_levels(
                "u1",
                vec![
                    ("a".to_string(), 0.85),
                    ("b".to_string(), 0.8),
                    ("c".to_string(), 0.1),
                ],
            )
            .await
            .unwrap();
        let insights = engine.learning_insights("u1").await.unwrap();
        assert_eq!(insights.strengths, vec!["a"]);
        assert_eq!(insights.weaknesses, vec!["c"]);
        assert_eq!(insights.optimal_study_time, TimeOfDay::Morning);
        assert_eq!(insights.learning_velocity, DEFAULT_VELOCITY);
    }

    #[tokio::test]
    async fn test_insights_pick_best_study_hour() {
        let engine = engine();
        let at = |hour: u32, accuracy: f64| PerformanceMetrics {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, hour, 15, 0).unwrap(),
            ..PerformanceMetrics::with_accuracy(accuracy)
        };
        for sample in [at(8, 0.3), at(8, 0.5), at(14, 0.9), at(14, 0.7), at(19, 0.6)] {
            engine.record_performance("u1", sample).await.unwrap();
        }

        let insights = engine.learning_insights("u1").await.unwrap();
        assert_eq!(insights.optimal_study_time, TimeOfDay::Afternoon);

        // two strong evening samples outrank the afternoon mean
        engine.record_performance("u1", at(20, 1.0)).await.unwrap();
        engine.record_performance("u1", at(20, 0.95)).await.unwrap();
        let insights = engine.learning_insights("u1").await.unwrap();
        assert_eq!(insights.optimal_study_time, TimeOfDay::Evening);
    }

    #[tokio::test]
    async fn test_record_performance_rejects_bad_accuracy() {
        let engine = engine();
        for accuracy in [1.5, -0.1, f64::NAN] {
            let err = engine
                .record_performance("u1", PerformanceMetrics::with_accuracy(accuracy))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        let model = engine.get_or_create_model("u1").await.unwrap();
        assert!(model.performance_history.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_stale_models() {
        let engine = engine();
        engine.get_or_create_model("u1").await.unwrap();
        assert_eq!(engine.cleanup_stale_models(Duration::minutes(30)).await, 0);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(engine.cleanup_stale_models(Duration::milliseconds(1)).await, 1);
        assert_eq!(engine.model_count().await, 0);
    }
}
