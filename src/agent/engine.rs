//! Turn engine: the single entry point for an inbound message.
//!
//! Flow per call:
//! 1. Log the user turn
//! 2. Load history and profile (concurrently)
//! 3. No profile → onboarding gate
//! 4. Classify; when the classifier is unsure, resume an open flow, take a
//!    bare "yes" as acceptance of an open suggestion, or ask for clarification
//! 5. Dispatch
//! 6. Log the reply (with its flow marker) and return it
//!
//! [`Engine::process_message`] never fails. Any error escaping steps 2 to 5 is
//! replaced with a fixed apology, and the turn pair is still logged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::{error, info};

use super::classifier::IntentClassifier;
use super::dispatch::{ActionDispatcher, DispatchContext, DispatchOutcome};
use super::flow::{FlowInferencer, FlowState};
use super::intent::{FALLBACK_CLARIFICATION, IntentKind, IntentResult};
use super::prompts;
use super::turn_log::TurnLogger;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::onboarding::OnboardingGate;
use crate::services::{ProfileScraper, Services};
use crate::store::{HistoryStore, ProfileStore, Role, SuggestionStore};
use crate::telemetry;

/// Collaborators the engine is built from.
#[derive(Clone)]
pub struct EngineDeps {
    pub history: Arc<dyn HistoryStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub suggestions: Arc<dyn SuggestionStore>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub scraper: Arc<dyn ProfileScraper>,
    pub services: Services,
}

/// Which path produced a reply; used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnPath {
    Onboarding,
    Clarification,
    Resumed,
    Dispatched,
    Fatal,
}

impl TurnPath {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Clarification => "clarification",
            Self::Resumed => "resumed",
            Self::Dispatched => "dispatched",
            Self::Fatal => "fatal",
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    history: Arc<dyn HistoryStore>,
    profiles: Arc<dyn ProfileStore>,
    classifier: Arc<dyn IntentClassifier>,
    dispatcher: ActionDispatcher,
    onboarding: OnboardingGate,
    logger: TurnLogger,
    locks: TurnLocks,
}

impl Engine {
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        Self {
            dispatcher: ActionDispatcher::new(
                deps.services,
                deps.profiles.clone(),
                deps.suggestions,
            ),
            onboarding: OnboardingGate::new(deps.profiles.clone(), deps.scraper),
            logger: TurnLogger::new(deps.history.clone()),
            history: deps.history,
            profiles: deps.profiles,
            classifier: deps.classifier,
            locks: TurnLocks::default(),
            config,
        }
    }

    /// History writes dropped since startup.
    pub fn failed_history_writes(&self) -> u64 {
        self.logger.failed_writes()
    }

    /// Handle one inbound message and return the reply.
    ///
    /// Always resolves, and always appends one user turn followed by one
    /// assistant turn (best-effort).
    pub async fn process_message(&self, user_id: &str, message: &str) -> String {
        let _turn = if self.config.serialize_turns {
            Some(self.locks.acquire(user_id).await)
        } else {
            None
        };

        let logged = self.logger.log_user(user_id, message).await;

        let (outcome, path) = match self.run_turn(user_id, message, logged).await {
            Ok(done) => done,
            Err(e) => {
                error!(user_id, error = %e, "Turn failed, replying with fallback");
                (DispatchOutcome::reply(prompts::FATAL_FALLBACK), TurnPath::Fatal)
            }
        };

        self.logger
            .log_assistant(user_id, &outcome.reply, outcome.flow.as_ref())
            .await;
        telemetry::record_turn(path.as_str());
        info!(
            user_id,
            path = path.as_str(),
            awaiting = outcome.flow.as_ref().map(FlowState::label),
            "Turn complete"
        );
        outcome.reply
    }

    /// `logged` says whether the current message made it into history; only
    /// then is the trailing user turn the current one.
    async fn run_turn(
        &self,
        user_id: &str,
        message: &str,
        logged: bool,
    ) -> Result<(DispatchOutcome, TurnPath)> {
        // One extra so the window stays full once the current turn is dropped.
        let (history, profile) = tokio::join!(
            self.history.recent(user_id, self.config.history_limit + 1),
            self.profiles.get_profile(user_id),
        );
        let mut history = history?;
        let profile = profile?;

        if logged
            && history
                .last()
                .is_some_and(|t| t.role == Role::User && t.content == message)
        {
            history.pop();
        }
        if history.len() > self.config.history_limit {
            history.drain(..history.len() - self.config.history_limit);
        }

        let Some(profile) = profile else {
            let reply = self.onboarding.handle(user_id, message).await?;
            return Ok((DispatchOutcome::reply(reply), TurnPath::Onboarding));
        };

        let flow = FlowInferencer::infer(&history);
        let window = &history[history.len().saturating_sub(self.config.classifier_history)..];
        let result = self
            .classifier
            .classify(message, window, Some(&profile))
            .await;
        info!(
            user_id,
            intent = %result.kind(),
            confidence = result.confidence,
            needs_clarification = result.needs_clarification,
            "Classified message"
        );

        let ctx = DispatchContext {
            user_id,
            profile: &profile,
            history: &history,
            message,
            flow: flow.as_ref(),
        };

        if !self.is_actionable(&result) {
            if let Some(open) = &flow {
                let outcome = self.dispatcher.resume(open, &ctx).await;
                return Ok((outcome, TurnPath::Resumed));
            }
            if let Some(outcome) = self.dispatcher.accept_suggestion(&ctx).await {
                return Ok((outcome, TurnPath::Dispatched));
            }
            let question = result
                .clarification
                .unwrap_or_else(|| FALLBACK_CLARIFICATION.to_string());
            return Ok((DispatchOutcome::reply(question), TurnPath::Clarification));
        }

        let outcome = self.dispatcher.dispatch(&result.intent, &ctx).await;
        Ok((outcome, TurnPath::Dispatched))
    }

    fn is_actionable(&self, result: &IntentResult) -> bool {
        result.kind() != IntentKind::Unknown
            && !result.needs_clarification
            && result.confidence >= self.config.min_confidence
    }
}

/// One async mutex per user so a user's turns run one at a time.
///
/// Entries nobody holds or waits on are pruned on each acquire.
#[derive(Default)]
pub struct TurnLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

}
