//! Action dispatcher. Executes a resolved intent against the owning
//! subsystem.
//!
//! Handlers return `Result<DispatchOutcome>`. Missing arguments are not
//! errors: handlers answer them with a follow-up question (and usually a
//! [`FlowState`] marker). Errors are turned into user-facing text here, in
//! one place:
//!
//! - a quota/limit signal becomes an explanation of what is blocked
//! - everything else becomes a generic apology, with the cause logged

mod embed;
mod insights;
mod pages;
mod profile;

use std::sync::Arc;

use tracing::{error, info, warn};

use super::flow::FlowState;
use super::intent::{CreatePageEntities, Intent};
use super::prompts;
use super::text::is_affirmative;
use crate::error::{Error, Result};
use crate::profile::BusinessProfile;
use crate::services::{PageSummary, Services};
use crate::store::{ConversationTurn, ProfileStore, SuggestionStore};
use crate::suggestions::{Suggestion, match_affirmative};

/// Everything a handler may read about the current turn.
pub struct DispatchContext<'a> {
    pub user_id: &'a str,
    pub profile: &'a BusinessProfile,
    /// Prior turns, oldest first, excluding the current message.
    pub history: &'a [ConversationTurn],
    /// The raw user message.
    pub message: &'a str,
    /// The flow the previous assistant turn left open, if any.
    pub flow: Option<&'a FlowState>,
}

/// A reply plus the flow marker to store with it.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub reply: String,
    pub flow: Option<FlowState>,
}

impl DispatchOutcome {
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            flow: None,
        }
    }

    pub fn awaiting(reply: impl Into<String>, flow: FlowState) -> Self {
        Self {
            reply: reply.into(),
            flow: Some(flow),
        }
    }
}

pub struct ActionDispatcher {
    services: Services,
    profiles: Arc<dyn ProfileStore>,
    suggestions: Arc<dyn SuggestionStore>,
}

impl ActionDispatcher {
    pub fn new(
        services: Services,
        profiles: Arc<dyn ProfileStore>,
        suggestions: Arc<dyn SuggestionStore>,
    ) -> Self {
        Self {
            services,
            profiles,
            suggestions,
        }
    }

    /// Execute `intent`. Always produces a reply.
    pub async fn dispatch(&self, intent: &Intent, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        info!(
            user_id = ctx.user_id,
            intent = %intent.kind(),
            open_flow = ctx.flow.map(FlowState::label),
            "Dispatching intent"
        );
        let result = match intent {
            Intent::UpdateProfile(update) => self.update_profile(ctx, update, false).await,
            Intent::UserCorrection(update) => self.update_profile(ctx, update, true).await,
            Intent::CreateWebsite => self.create_website(ctx).await,
            Intent::WriteBlog { topic } => self.write_blog(ctx, topic.as_deref()).await,
            Intent::GetSuggestions => self.list_suggestions(ctx).await,
            Intent::CreatePage(entities) => self.create_page(ctx, entities).await,
            Intent::DeletePage { page, confirmed } => {
                self.delete_page(ctx, page.as_deref(), *confirmed).await
            }
            Intent::RenamePage { page, new_title } => {
                self.rename_page(ctx, page.as_deref(), new_title.as_deref())
                    .await
            }
            Intent::UpdatePageContent { page, instructions } => {
                self.update_page_content(ctx, page.as_deref(), instructions.as_deref())
                    .await
            }
            Intent::GenerateLegalPages => self.generate_legal_pages(ctx).await,
            Intent::GetAnalytics => self.analytics(ctx).await,
            Intent::AddEmbed { page, html } => {
                self.add_embed(ctx, page.as_deref(), html.as_deref()).await
            }
            Intent::BillingQuestion => self.billing(ctx).await,
            Intent::Unknown => Ok(DispatchOutcome::reply(
                super::intent::FALLBACK_CLARIFICATION,
            )),
        };
        self.settle(ctx, result)
    }

    /// Continue an open flow with the raw message as its missing argument.
    pub async fn resume(&self, flow: &FlowState, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        info!(
            user_id = ctx.user_id,
            flow = flow.label(),
            "Resuming open flow"
        );
        let result = match flow {
            FlowState::EmbedPage => self.resume_embed_page(ctx).await,
            FlowState::EmbedHtml {
                page_slug,
                page_title,
            } => self.resume_embed_html(ctx, page_slug, page_title).await,
            FlowState::DeleteConfirmation {
                page_slug,
                page_title,
            } => self.resume_delete(ctx, page_slug, page_title).await,
            FlowState::PageDetails { .. } => self.complete_page_details(ctx, flow, None).await,
        };
        self.settle(ctx, result)
    }

    /// Treat a bare "yes" as acceptance of the page suggestion most likely
    /// on offer. `None` when the message is not affirmative or nothing
    /// matches.
    pub async fn accept_suggestion(&self, ctx: &DispatchContext<'_>) -> Option<DispatchOutcome> {
        if !is_affirmative(ctx.message) {
            return None;
        }
        let suggestions = self.open_suggestions(ctx.user_id).await;
        let accepted = match_affirmative(&suggestions)?;
        info!(
            user_id = ctx.user_id,
            suggestion_id = %accepted.id,
            "Affirmative reply accepts open suggestion"
        );
        let intent = Intent::CreatePage(CreatePageEntities::default());
        Some(self.dispatch(&intent, ctx).await)
    }

    fn settle(&self, ctx: &DispatchContext<'_>, result: Result<DispatchOutcome>) -> DispatchOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(Error::Service(e)) if e.is_limit() => {
                warn!(user_id = ctx.user_id, error = %e, "Subsystem limit reached");
                DispatchOutcome::reply(prompts::limit_reached(&limit_reason(&e.to_string())))
            }
            Err(e) => {
                error!(user_id = ctx.user_id, error = %e, "Action failed");
                DispatchOutcome::reply(prompts::GENERIC_FAILURE)
            }
        }
    }

    async fn open_suggestions(&self, user_id: &str) -> Vec<Suggestion> {
        match self.suggestions.open_suggestions(user_id).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(user_id, error = %e, "Could not load open suggestions");
                Vec::new()
            }
        }
    }
}

fn limit_reason(message: &str) -> String {
    message
        .strip_prefix("Limit reached: ")
        .unwrap_or(message)
        .trim_end_matches('.')
        .to_string()
}

/// Resolve a page reference against the user's pages.
///
/// Exact case-insensitive match on slug or title first; otherwise the page
/// whose title or slug appears in the reference ("the contact page"),
/// longest name first.
pub(crate) fn resolve_page<'p>(pages: &'p [PageSummary], reference: &str) -> Option<&'p PageSummary> {
    let needle = reference.trim().trim_matches(|c: char| c == '"' || c == '\'').to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(page) = pages
        .iter()
        .find(|p| p.slug.to_lowercase() == needle || p.title.to_lowercase() == needle)
    {
        return Some(page);
    }

    let words = needle.replace('-', " ");
    let mut candidates: Vec<(&PageSummary, usize)> = pages
        .iter()
        .filter_map(|p| {
            [p.title.to_lowercase(), p.slug.replace('-', " ")]
                .into_iter()
                .filter(|name| contains_phrase(&words, name))
                .map(|name| name.len())
                .max()
                .map(|len| (p, len))
        })
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.first().map(|(p, _)| *p)
}

/// Whole-word containment.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
