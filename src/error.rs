//! Error types for Growth Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors raised by the subsystems the dispatcher drives (pages, legal,
/// analytics, billing).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Limit reached: {0}")]
    LimitReached(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service {service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("Operation failed: {0}")]
    Failed(String),
}

impl ServiceError {
    /// Whether this is a quota/plan limit rather than a transient fault.
    pub fn is_limit(&self) -> bool {
        match self {
            Self::LimitReached(_) => true,
            Self::Failed(reason) | Self::Unavailable { reason, .. } => {
                let lower = reason.to_lowercase();
                ["limit", "quota", "upgrade your plan"]
                    .iter()
                    .any(|needle| lower.contains(needle))
            }
            _ => false,
        }
    }
}

/// Failures while deriving a profile from a website or free text.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Nothing usable found at {0}")]
    Empty(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
