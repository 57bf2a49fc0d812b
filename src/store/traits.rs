//! Store traits: the engine's only view of persistence.
//!
//! The engine borrows read/write access to history, profiles, and
//! suggestions through these traits and never owns long-term storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::{BusinessProfile, ProfileUpdate};
use crate::suggestions::Suggestion;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted message. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    /// Structured side data (flow markers). Opaque to the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(user_id: &str, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            role,
            content: content.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Append-only per-user turn log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a turn.
    async fn append(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), DatabaseError>;

    /// The most recent `limit` turns, oldest first.
    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, DatabaseError>;
}

/// Single mutable business profile per user.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, DatabaseError>;

    /// Create the user's profile. Fails if one exists or no business name is given.
    async fn create_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<BusinessProfile, DatabaseError>;

    /// Merge a partial update into the existing profile.
    async fn update_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<(), DatabaseError>;
}

/// Read side of the suggestion generator's output.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Open (not yet acted on) suggestions, newest first.
    async fn open_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>, DatabaseError>;

    /// Record a suggestion unless the same text was offered within
    /// `dedup_window`. Returns `false` when deduplicated.
    async fn add_suggestion(
        &self,
        user_id: &str,
        suggestion: &Suggestion,
        dedup_window: std::time::Duration,
    ) -> Result<bool, DatabaseError>;
}
