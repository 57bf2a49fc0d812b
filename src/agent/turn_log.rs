//! Best-effort persistence of each turn pair.
//!
//! A failed write is logged, counted, and otherwise ignored; it never
//! reaches the caller or delays the reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use super::flow::FlowState;
use crate::store::{HistoryStore, Role};
use crate::telemetry;

pub struct TurnLogger {
    history: Arc<dyn HistoryStore>,
    failed_writes: AtomicU64,
}

impl TurnLogger {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            history,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Persist the inbound message. Returns whether it was stored.
    pub async fn log_user(&self, user_id: &str, content: &str) -> bool {
        self.write(user_id, Role::User, content, None).await
    }

    /// Persist the reply together with the flow it leaves open.
    pub async fn log_assistant(&self, user_id: &str, content: &str, flow: Option<&FlowState>) {
        let metadata = flow.map(FlowState::to_metadata);
        self.write(user_id, Role::Assistant, content, metadata.as_ref())
            .await;
    }

    /// Writes dropped since startup.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    async fn write(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> bool {
        match self.history.append(user_id, role, content, metadata).await {
            Ok(()) => true,
            Err(e) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                telemetry::record_history_write_failure(role.as_str());
                warn!(user_id, role = %role, error = %e, "Failed to persist conversation turn");
                false
            }
        }
    }
}
