//! libSQL backend: async implementation of the store traits.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::{BusinessProfile, ProfileUpdate};
use crate::store::migrations;
use crate::store::traits::{ConversationTurn, HistoryStore, ProfileStore, Role, SuggestionStore};
use crate::suggestions::{self, Suggestion, SuggestionMetadata};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn write_profile(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.conn()
            .execute(
                "INSERT INTO business_profiles (user_id, profile, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET profile = ?2, updated_at = ?4",
                params![
                    user_id,
                    json,
                    profile.created_at.to_rfc3339(),
                    profile.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("write_profile: {e}")))?;
        Ok(())
    }

    async fn suggestions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, text, category, priority, actionable, metadata, created_at
                 FROM suggestions WHERE user_id = ?1 AND created_at >= ?2
                 ORDER BY created_at DESC",
                params![user_id, since.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("suggestions_since: {e}")))?;

        let mut out = Vec::new();
        while let Some(row) = next_row(&mut rows, "suggestions_since").await? {
            if let Some(s) = row_to_suggestion(&row) {
                out.push(s);
            }
        }
        Ok(out)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Advance a result set. A failed step is an error, not the end of the rows.
async fn next_row(rows: &mut libsql::Rows, op: &str) -> Result<Option<libsql::Row>, DatabaseError> {
    rows.next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

/// Serialize a unit enum through serde to its string tag.
fn enum_tag<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    let v = serde_json::to_value(value).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| DatabaseError::Serialization("expected string tag".into()))
}

fn parse_tag<T: serde::de::DeserializeOwned>(tag: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(tag.to_string())).ok()
}

fn row_to_suggestion(row: &libsql::Row) -> Option<Suggestion> {
    let id: String = row.get(0).ok()?;
    let text: String = row.get(1).ok()?;
    let category: String = row.get(2).ok()?;
    let priority: String = row.get(3).ok()?;
    let actionable: i64 = row.get(4).unwrap_or(1);
    let metadata: String = row.get(5).unwrap_or_else(|_| "{}".to_string());
    let created: String = row.get(6).unwrap_or_default();

    Some(Suggestion {
        id,
        text,
        category: parse_tag(&category)?,
        priority: parse_tag(&priority)?,
        actionable: actionable != 0,
        created_at: parse_datetime(&created),
        metadata: serde_json::from_str::<SuggestionMetadata>(&metadata).unwrap_or_default(),
    })
}

// ── History ─────────────────────────────────────────────────────────

#[async_trait]
impl HistoryStore for LibSqlBackend {
    async fn append(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), DatabaseError> {
        let id = Uuid::new_v4();
        let metadata = metadata.map(|m| m.to_string());
        self.conn()
            .execute(
                "INSERT INTO conversation_turns (id, user_id, role, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    user_id,
                    role.as_str(),
                    content,
                    opt_text(metadata),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_turn: {e}")))?;
        debug!(user_id, role = %role, "Turn appended");
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, role, content, metadata, created_at FROM conversation_turns
                 WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2",
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_turns: {e}")))?;

        let mut turns = Vec::new();
        while let Some(row) = next_row(&mut rows, "recent_turns").await? {
            let id_str: String = row.get(0).unwrap_or_default();
            let role_str: String = row.get(1).unwrap_or_default();
            let content: String = row.get(2).unwrap_or_default();
            let metadata_str: Option<String> = row.get(3).ok();
            let created_str: String = row.get(4).unwrap_or_default();
            let Some(role) = Role::parse(&role_str) else {
                continue;
            };
            turns.push(ConversationTurn {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
                user_id: user_id.to_string(),
                role,
                content,
                metadata: metadata_str.and_then(|m| serde_json::from_str(&m).ok()),
                created_at: parse_datetime(&created_str),
            });
        }
        turns.reverse(); // oldest first
        Ok(turns)
    }
}

// ── Profiles ────────────────────────────────────────────────────────

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT profile FROM business_profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;
                let profile = serde_json::from_str(&json)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn create_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<BusinessProfile, DatabaseError> {
        if self.get_profile(user_id).await?.is_some() {
            return Err(DatabaseError::Constraint(format!(
                "profile already exists for user {user_id}"
            )));
        }
        let profile = BusinessProfile::from_update(partial).ok_or_else(|| {
            DatabaseError::Constraint("profile requires a business name".to_string())
        })?;
        self.write_profile(user_id, &profile).await?;
        info!(user_id, business = %profile.business_name, "Profile created");
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        partial: &ProfileUpdate,
    ) -> Result<(), DatabaseError> {
        let mut profile =
            self.get_profile(user_id)
                .await?
                .ok_or_else(|| DatabaseError::NotFound {
                    entity: "business_profile".into(),
                    id: user_id.to_string(),
                })?;
        if profile.apply(partial).is_empty() {
            return Ok(());
        }
        self.write_profile(user_id, &profile).await
    }
}

// ── Suggestions ─────────────────────────────────────────────────────

#[async_trait]
impl SuggestionStore for LibSqlBackend {
    async fn open_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, text, category, priority, actionable, metadata, created_at
                 FROM suggestions WHERE user_id = ?1 AND status = 'open'
                 ORDER BY created_at DESC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("open_suggestions: {e}")))?;

        let mut out = Vec::new();
        while let Some(row) = next_row(&mut rows, "open_suggestions").await? {
            if let Some(s) = row_to_suggestion(&row) {
                out.push(s);
            }
        }
        Ok(out)
    }

    async fn add_suggestion(
        &self,
        user_id: &str,
        suggestion: &Suggestion,
        dedup_window: Duration,
    ) -> Result<bool, DatabaseError> {
        let now = Utc::now();
        let since = now
            - chrono::Duration::from_std(dedup_window).unwrap_or(chrono::Duration::hours(24));
        let recent = self.suggestions_since(user_id, since).await?;
        if suggestions::is_duplicate(&suggestion.text, &recent, now, dedup_window) {
            debug!(user_id, "Suggestion deduplicated");
            return Ok(false);
        }

        let metadata = serde_json::to_string(&suggestion.metadata)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.conn()
            .execute(
                "INSERT INTO suggestions (id, user_id, text, category, priority, actionable, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    suggestion.id.clone(),
                    user_id,
                    suggestion.text.clone(),
                    enum_tag(&suggestion.category)?,
                    enum_tag(&suggestion.priority)?,
                    suggestion.actionable as i64,
                    metadata,
                    suggestion.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("add_suggestion: {e}")))?;
        Ok(true)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PageType;
    use crate::suggestions::{SuggestionCategory, SuggestionPriority};

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn recent_is_oldest_first_and_limited() {
        let db = test_db().await;
        for i in 0..4 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            db.append("u1", role, &format!("t{i}"), None).await.unwrap();
        }
        db.append("u2", Role::User, "other user", None).await.unwrap();

        let turns = db.recent("u1", 3).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["t1", "t2", "t3"]);
        assert_eq!(turns[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn failed_row_step_is_an_error_not_a_short_read() {
        let db = test_db().await;
        db.append("u1", Role::User, "{}", None).await.unwrap();
        db.append("u1", Role::User, "not json", None).await.unwrap();

        let mut rows = db
            .conn()
            .query(
                "SELECT json(content) FROM conversation_turns WHERE user_id = ?1 ORDER BY seq",
                params!["u1"],
            )
            .await
            .unwrap();
        assert!(next_row(&mut rows, "json_turns").await.unwrap().is_some());
        let err = next_row(&mut rows, "json_turns").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(msg) if msg.starts_with("json_turns")));
    }

    #[tokio::test]
    async fn turn_metadata_roundtrips() {
        let db = test_db().await;
        let marker = serde_json::json!({"awaiting": "embed_page"});
        db.append("u1", Role::Assistant, "Which page?", Some(&marker))
            .await
            .unwrap();
        let turns = db.recent("u1", 1).await.unwrap();
        assert_eq!(turns[0].metadata.as_ref(), Some(&marker));
    }

    #[tokio::test]
    async fn profile_create_get_update() {
        let db = test_db().await;
        assert!(db.get_profile("u1").await.unwrap().is_none());

        let partial = ProfileUpdate {
            business_name: Some("Rosa's Bakery".into()),
            industry: Some("bakery".into()),
            ..Default::default()
        };
        db.create_profile("u1", &partial).await.unwrap();
        assert!(db.create_profile("u1", &partial).await.is_err());

        db.update_profile(
            "u1",
            &ProfileUpdate {
                target_audience: Some("families".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = db.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.business_name, "Rosa's Bakery");
        assert_eq!(profile.target_audience.as_deref(), Some("families"));
    }

    #[tokio::test]
    async fn create_profile_without_name_fails() {
        let db = test_db().await;
        let err = db
            .create_profile("u1", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)));
        assert!(db.get_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn suggestions_roundtrip_and_dedup() {
        let db = test_db().await;
        let s = Suggestion::new(
            "Add an FAQ page",
            SuggestionCategory::SeoOpportunity,
            SuggestionPriority::High,
        )
        .with_page_type(PageType::Faq)
        .with_keyword("bakery faq");
        let window = Duration::from_secs(86_400);

        assert!(db.add_suggestion("u1", &s, window).await.unwrap());
        let dup = Suggestion::new(
            "Add an FAQ page!",
            SuggestionCategory::SeoOpportunity,
            SuggestionPriority::High,
        );
        assert!(!db.add_suggestion("u1", &dup, window).await.unwrap());

        let open = db.open_suggestions("u1").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].metadata.page_type, Some(PageType::Faq));
        assert_eq!(open[0].category, SuggestionCategory::SeoOpportunity);
    }

    #[tokio::test]
    async fn file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("growth.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.append("u1", Role::User, "hello", None).await.unwrap();
        }
        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(db.recent("u1", 10).await.unwrap().len(), 1);
    }
}
