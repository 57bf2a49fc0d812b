//! Intent classification.
//!
//! [`IntentClassifier`] is total: it always yields a structurally valid
//! [`IntentResult`]. Transport failures and unparseable model output both
//! collapse to [`IntentResult::fallback`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::intent::{IntentKind, IntentResult, parse_classifier_output};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::profile::BusinessProfile;
use crate::store::ConversationTurn;
use crate::telemetry;

/// Max tokens for the classification call.
const CLASSIFY_MAX_TOKENS: u32 = 512;

const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Per-turn characters kept in the transcript.
const TURN_PREVIEW_CHARS: usize = 400;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `message` given recent history (oldest first) and the profile.
    async fn classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
        profile: Option<&BusinessProfile>,
    ) -> IntentResult;
}

/// Classifier backed by a completion model.
pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmProvider>,
    history_window: usize,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, history_window: usize) -> Self {
        Self {
            llm,
            history_window,
        }
    }

    async fn try_classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
        profile: Option<&BusinessProfile>,
    ) -> Result<IntentResult, String> {
        let window = &history[history.len().saturating_sub(self.history_window)..];
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_classifier_system_prompt()),
            ChatMessage::user(build_classifier_user_prompt(message, window, profile)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| format!("LLM call failed: {e}"))?;

        parse_classifier_output(&response.content).map_err(|e| {
            warn!(
                raw_response = %response.content,
                error = %e,
                "Failed to parse classifier response"
            );
            e
        })
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
        profile: Option<&BusinessProfile>,
    ) -> IntentResult {
        match self.try_classify(message, history, profile).await {
            Ok(result) => {
                debug!(
                    model = self.llm.model_name(),
                    intent = %result.kind(),
                    confidence = result.confidence,
                    "Classified message"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, falling back to UNKNOWN");
                telemetry::record_classifier_fallback();
                IntentResult::fallback()
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classifier_system_prompt() -> String {
    let tags = IntentKind::ALL
        .iter()
        .map(IntentKind::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You route messages for an assistant that helps small businesses grow their website.\n\n\
         Classify the user's latest message into exactly one intent: {tags}.\n\n\
         Entities by intent:\n\
         - UPDATE_PROFILE / USER_CORRECTION: businessName, industry, location {{address, city, state, zip, country}}, phone, email, website, services [{{name, description, price}}], hours, brandVoice (friendly|professional|witty|formal), targetAudience, field + value for anything else\n\
         - CREATE_PAGE: title, pageType (faq|blog|testimonial|standard), keyword, details\n\
         - DELETE_PAGE: page, confirmed (true only if the user explicitly confirmed)\n\
         - RENAME_PAGE: page, newTitle\n\
         - UPDATE_PAGE_CONTENT: page, instructions\n\
         - ADD_EMBED: page, html\n\
         - WRITE_BLOG: topic\n\n\
         Respond with ONLY a JSON object:\n\
         {{\"intent\": \"...\", \"entities\": {{}}, \"needsClarification\": false, \"clarificationQuestion\": \"...\", \"confidence\": 0.0}}\n\n\
         Rules:\n\
         - Use the recent conversation to resolve short replies like \"yes\" or a bare page name\n\
         - Set needsClarification with a short question when the request is ambiguous\n\
         - Omit entities the message does not mention\n\
         - Use UNKNOWN for small talk or anything outside these intents"
    )
}

fn build_classifier_user_prompt(
    message: &str,
    history: &[ConversationTurn],
    profile: Option<&BusinessProfile>,
) -> String {
    let mut prompt = String::with_capacity(1024);

    match profile {
        Some(profile) => {
            prompt.push_str(&profile.to_prompt_section());
            prompt.push('\n');
        }
        None => prompt.push_str("Business profile: (not set up yet)\n"),
    }

    if !history.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for turn in history {
            let preview: String = turn.content.chars().take(TURN_PREVIEW_CHARS).collect();
            prompt.push_str(&format!("  {}: {}\n", turn.role, preview));
        }
    }

    prompt.push_str(&format!("\nLatest message:\n{message}"));
    prompt
}
