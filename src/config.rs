use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ProductionConfig {
    pub database_path: PathBuf,
    pub pull_task_minutes: u16,
    pub produce_task_minutes: u16,
    pub trash_ttl_days: i64,
    pub log_ttl_days: i64,
    /// Capability required when a finished item names none.
    pub default_capability: String,
    /// Fraction of a lane's width a horizontal drag must cover per bias step.
    pub lane_nudge_ratio: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("production.db"),
            pull_task_minutes: 15,
            produce_task_minutes: 120,
            trash_ttl_days: 7,
            log_ttl_days: 30,
            default_capability: "production".to_string(),
            lane_nudge_ratio: 0.5,
        }
    }
}

impl ProductionConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            database_path: env::var("PRODUCTION_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            pull_task_minutes: parse_var("PULL_TASK_MINUTES", defaults.pull_task_minutes),
            produce_task_minutes: parse_var("PRODUCE_TASK_MINUTES", defaults.produce_task_minutes),
            trash_ttl_days: parse_var("TRASH_TTL_DAYS", defaults.trash_ttl_days),
            log_ttl_days: parse_var("LOG_TTL_DAYS", defaults.log_ttl_days),
            default_capability: env::var("DEFAULT_CAPABILITY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.default_capability),
            lane_nudge_ratio: parse_var("LANE_NUDGE_RATIO", defaults.lane_nudge_ratio),
        }
    }
}

fn parse_var<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring malformed {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProductionConfig::default();
        assert_eq!(config.pull_task_minutes, 15);
        assert_eq!(config.trash_ttl_days, 7);
        assert_eq!(config.log_ttl_days, 30);
        assert_eq!(config.default_capability, "production");
    }

    #[test]
    fn test_malformed_value_falls_back() {
        env::set_var("KP_TEST_MALFORMED_MINUTES", "soon");
        assert_eq!(parse_var("KP_TEST_MALFORMED_MINUTES", 42u16), 42);
        env::set_var("KP_TEST_MALFORMED_MINUTES", " 30 ");
        assert_eq!(parse_var("KP_TEST_MALFORMED_MINUTES", 42u16), 30);
        env::remove_var("KP_TEST_MALFORMED_MINUTES");
    }
}
