//! Mastery → difficulty classification tables.
//!
//! Three call sites classify mastery with different cut points: session
//! seeding (preference dependent), the personalization engine's internal
//! level, and explanation complexity. Each keeps its own table; they are
//! deliberately not merged.

use serde::Serialize;

use crate::model::types::{DifficultyLevel, DifficultyPreference};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    pub name: &'static str,
    /// `(upper_bound, level)` pairs in ascending bound order; mastery strictly
    /// below a bound maps to its level.
    pub bands: Vec<(f64, DifficultyLevel)>,
    pub ceiling: DifficultyLevel,
}

impl ThresholdTable {
    pub fn new(
        name: &'static str,
        bands: &[(f64, DifficultyLevel)],
        ceiling: DifficultyLevel,
    ) -> Self {
        Self {
            name,
            bands: bands.to_vec(),
            ceiling,
        }
    }

    pub fn classify(&self, mastery: f64) -> DifficultyLevel {
        self.bands
            .iter()
            .find(|(bound, _)| mastery < *bound)
            .map(|(_, level)| *level)
            .unwrap_or(self.ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyPolicy {
    pub engine_level: ThresholdTable,
    pub explanation_complexity: ThresholdTable,
    pub seed_adaptive: ThresholdTable,
    pub seed_challenging: ThresholdTable,
    pub seed_comfortable: ThresholdTable,
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        use DifficultyLevel::*;

        Self {
            engine_level: ThresholdTable::new(
                "engine_level",
                &[(0.3, Beginner), (0.6, Intermediate), (0.8, Advanced)],
                Expert,
            ),
            explanation_complexity: ThresholdTable::new(
                "explanation_complexity",
                &[(0.3, Beginner), (0.6, Intermediate), (0.8, Advanced)],
                Expert,
            ),
            seed_adaptive: ThresholdTable::new(
                "seed_adaptive",
                &[(0.4, Beginner), (0.7, Intermediate), (0.9, Advanced)],
                Expert,
            ),
            seed_challenging: ThresholdTable::new(
                "seed_challenging",
                &[(0.3, Intermediate), (0.6, Advanced)],
                Expert,
            ),
            seed_comfortable: ThresholdTable::new(
                "seed_comfortable",
                &[(0.5, Beginner), (0.8, Intermediate)],
                Advanced,
            ),
        }
    }
}

impl DifficultyPolicy {
    pub fn seeding_table(&self, preference: DifficultyPreference) -> &ThresholdTable {
        match preference {
            DifficultyPreference::Adaptive => &self.seed_adaptive,
            DifficultyPreference::Challenging => &self.seed_challenging,
            DifficultyPreference::Comfortable => &self.seed_comfortable,
        }
    }

    /// Learners with no recorded mastery for the topic always start as beginners.
    pub fn seed_difficulty(
        &self,
        mastery: Option<f64>,
        preference: DifficultyPreference,
    ) -> DifficultyLevel {
        match mastery {
            Some(mastery) => self.seeding_table(preference).classify(mastery),
            None => DifficultyLevel::Beginner,
        }
    }

    pub fn engine_level(&self, mastery: f64) -> DifficultyLevel {
        self.engine_level.classify(mastery)
    }

    pub fn explanation_complexity(&self, mastery: f64) -> DifficultyLevel {
        self.explanation_complexity.classify(mastery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DifficultyLevel::*;

    #[test]
    fn test_engine_table_cut_points() {
        let policy = DifficultyPolicy::default();
        assert_eq!(policy.engine_level(0.0), Beginner);
        assert_eq!(policy.engine_level(0.29), Beginner);
        assert_eq!(policy.engine_level(0.3), Intermediate);
        assert_eq!(policy.engine_level(0.6), Advanced);
        assert_eq!(policy.engine_level(0.8), Expert);
        assert_eq!(policy.engine_level(1.0), Expert);
    }

    #[test]
    fn test_seeding_tables_differ_by_preference() {
        let policy = DifficultyPolicy::default();
        assert_eq!(policy.seed_difficulty(Some(0.35), DifficultyPreference::Adaptive), Beginner);
        assert_eq!(
            policy.seed_difficulty(Some(0.35), DifficultyPreference::Challenging),
            Advanced
        );
        assert_eq!(
            policy.seed_difficulty(Some(0.35), DifficultyPreference::Comfortable),
            Beginner
        );
        assert_eq!(policy.seed_difficulty(Some(0.95), DifficultyPreference::Comfortable), Advanced);
        assert_eq!(policy.seed_difficulty(Some(0.95), DifficultyPreference::Adaptive), Expert);
    }

    #[test]
    fn test_missing_mastery_seeds_beginner() {
        let policy = DifficultyPolicy::default();
        for preference in [
            DifficultyPreference::Adaptive,
            DifficultyPreference::Challenging,
            DifficultyPreference::Comfortable,
        ] {
            assert_eq!(policy.seed_difficulty(None, preference), Beginner);
        }
    }

    #[test]
    fn test_tables_are_pluggable() {
        let mut policy = DifficultyPolicy::default();
        policy.explanation_complexity =
            ThresholdTable::new("flat", &[(0.5, Beginner)], Expert);
        assert_eq!(policy.explanation_complexity(0.4), Beginner);
        assert_eq!(policy.explanation_complexity(0.55), Expert);
        assert_eq!(policy.engine_level(0.55), Intermediate);
    }
}
