//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Turn-processing engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many history turns to load for context-building.
    pub history_limit: usize,
    /// How many of those turns the classifier sees.
    pub classifier_history: usize,
    /// Classifications below this confidence are answered with a clarification.
    pub min_confidence: f32,
    /// Serialize turns per user so flow inference never races.
    pub serialize_turns: bool,
    /// Window for suggestion text deduplication.
    pub suggestion_dedup_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            classifier_history: 20,
            min_confidence: 0.5,
            serialize_turns: true,
            suggestion_dedup_window: Duration::from_secs(24 * 3600), // 24 hours
        }
    }
}

impl EngineConfig {
    /// Build from `GROWTH_ASSIST_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            history_limit: env_parse("GROWTH_ASSIST_HISTORY_LIMIT", defaults.history_limit)?,
            classifier_history: env_parse(
                "GROWTH_ASSIST_CLASSIFIER_HISTORY",
                defaults.classifier_history,
            )?,
            min_confidence: env_parse("GROWTH_ASSIST_MIN_CONFIDENCE", defaults.min_confidence)?,
            serialize_turns: env_parse("GROWTH_ASSIST_SERIALIZE_TURNS", defaults.serialize_turns)?,
            suggestion_dedup_window: Duration::from_secs(
                env_parse::<u64>("GROWTH_ASSIST_SUGGESTION_DEDUP_HOURS", 24)? * 3600,
            ),
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}
