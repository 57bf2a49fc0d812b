//! In-memory store backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::traits::{ConversationTurn, HistoryStore, ProfileStore, Role, SuggestionStore};
use crate::error::DatabaseError;
use crate::profile::{BusinessProfile, ProfileUpdate};
use crate::suggestions::{self, Suggestion};

/// Keeps every user's turns, profile, and suggestions in process memory.
#[derive(Default)]
pub struct MemoryStore {
    turns: RwLock<HashMap<String, Vec<ConversationTurn>>>,
    profiles: RwLock<HashMap<String, BusinessProfile>>,
    suggestions: RwLock<HashMap<String, Vec<Suggestion>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every turn for a user, oldest first.
    pub async fn all_turns(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.turns
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a profile directly.
    pub async fn put_profile(&self, user_id: &str, profile: BusinessProfile) {
        self.profiles
            .write()
            .await
            .insert(user_id.to_string(), profile);
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), DatabaseError> {
        let mut turn = ConversationTurn::new(user_id, role, content);
        turn.metadata = metadata.cloned();
        self.turns
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, DatabaseError> {
        let guard = self.turns.read().await;
        let turns = guard.get(user_id).map(Vec::as_slice).unwrap_or_default();
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, DatabaseError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn create_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<BusinessProfile, DatabaseError> {
        let mut guard = self.profiles.write().await;
        if guard.contains_key(user_id) {
            return Err(DatabaseError::Constraint(format!(
                "profile already exists for user {user_id}"
            )));
        }
        let profile = BusinessProfile::from_update(partial).ok_or_else(|| {
            DatabaseError::Constraint("profile requires a business name".to_string())
        })?;
        guard.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<(), DatabaseError> {
        let mut guard = self.profiles.write().await;
        let profile = guard
            .get_mut(user_id)
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "business_profile".into(),
                id: user_id.to_string(),
            })?;
        profile.apply(partial);
        Ok(())
    }
}

#[async_trait]
impl SuggestionStore for MemoryStore {
    async fn open_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>, DatabaseError> {
        let mut list = self
            .suggestions
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn add_suggestion(
        &self,
        user_id: &str,
        suggestion: &Suggestion,
        dedup_window: Duration,
    ) -> Result<bool, DatabaseError> {
        let mut guard = self.suggestions.write().await;
        let list = guard.entry(user_id.to_string()).or_default();
        if suggestions::is_duplicate(&suggestion.text, list, Utc::now(), dedup_window) {
            return Ok(false);
        }
        list.push(suggestion.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::{SuggestionCategory, SuggestionPriority};

    #[tokio::test]
    async fn recent_returns_tail_oldest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .append("u1", Role::User, &format!("m{i}"), None)
                .await
                .unwrap();
        }
        let recent = store.recent("u1", 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn recent_for_unknown_user_is_empty() {
        let store = MemoryStore::new();
        assert!(store.recent("nobody", 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn at_most_one_profile_per_user() {
        let store = MemoryStore::new();
        let partial = ProfileUpdate {
            business_name: Some("Acme".into()),
            ..Default::default()
        };
        store.create_profile("u1", &partial).await.unwrap();
        assert!(store.create_profile("u1", &partial).await.is_err());
    }

    #[tokio::test]
    async fn update_missing_profile_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_profile("u1", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn suggestion_dedup_within_window() {
        let store = MemoryStore::new();
        let s = Suggestion::new(
            "Add an FAQ page",
            SuggestionCategory::SeoOpportunity,
            SuggestionPriority::High,
        );
        let window = Duration::from_secs(86_400);
        assert!(store.add_suggestion("u1", &s, window).await.unwrap());
        let again = Suggestion::new(
            "add an faq page",
            SuggestionCategory::SeoOpportunity,
            SuggestionPriority::High,
        );
        assert!(!store.add_suggestion("u1", &again, window).await.unwrap());
        assert_eq!(store.open_suggestions("u1").await.unwrap().len(), 1);
    }
}
