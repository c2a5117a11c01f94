use chrono::Duration;

use crate::orchestrator::OrchestratorSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub file_logs: bool,
    pub log_dir: String,
    pub session_max_age_hours: i64,
    pub performance_history_cap: usize,
    pub explanation_cache_capacity: usize,
    pub personalization_model_capacity: usize,
    pub session_cleanup_schedule: String,
    pub session_cleanup_enabled: bool,
    pub engine_model_max_idle_minutes: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());

        let session_max_age_hours = env_parse::<i64>("SESSION_MAX_AGE_HOURS")
            .filter(|hours| *hours > 0)
            .unwrap_or(24);

        let performance_history_cap = env_parse::<usize>("PERFORMANCE_HISTORY_CAP")
            .filter(|cap| *cap > 0)
            .unwrap_or(100);

        let explanation_cache_capacity =
            env_parse::<usize>("EXPLANATION_CACHE_CAPACITY").unwrap_or(512);

        let personalization_model_capacity =
            env_parse::<usize>("PERSONALIZATION_MODEL_CAPACITY").unwrap_or(10_000);

        let session_cleanup_schedule = std::env::var("SESSION_CLEANUP_SCHEDULE")
            .unwrap_or_else(|_| "0 */15 * * * *".to_string());

        let engine_model_max_idle_minutes = env_parse::<i64>("ENGINE_MODEL_MAX_IDLE_MINUTES")
            .filter(|minutes| *minutes > 0)
            .unwrap_or(30);

        Self {
            log_level,
            file_logs,
            log_dir,
            session_max_age_hours,
            performance_history_cap,
            explanation_cache_capacity,
            personalization_model_capacity,
            session_cleanup_schedule,
            session_cleanup_enabled: env_flag("ENABLE_SESSION_CLEANUP_WORKER", true),
            engine_model_max_idle_minutes,
        }
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::hours(self.session_max_age_hours)
    }

    pub fn engine_model_max_idle(&self) -> Duration {
        Duration::minutes(self.engine_model_max_idle_minutes)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            session_max_age: self.session_max_age(),
            history_cap: self.performance_history_cap,
            explanation_cache_capacity: self.explanation_cache_capacity,
            model_capacity: self.personalization_model_capacity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logs: false,
            log_dir: "./logs".to_string(),
            session_max_age_hours: 24,
            performance_history_cap: 100,
            explanation_cache_capacity: 512,
            personalization_model_capacity: 10_000,
            session_cleanup_schedule: "0 */15 * * * *".to_string(),
            session_cleanup_enabled: true,
            engine_model_max_idle_minutes: 30,
        }
    }
}
