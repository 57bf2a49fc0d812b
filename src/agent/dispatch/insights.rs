//! Read-only answers: analytics, open suggestions, billing.

use super::{ActionDispatcher, DispatchContext, DispatchOutcome};
use crate::error::Result;
use crate::services::AnalyticsSummary;
use crate::suggestions::{Suggestion, sort_for_display};

/// Suggestions listed per reply.
const MAX_LISTED_SUGGESTIONS: usize = 5;

impl ActionDispatcher {
    pub(super) async fn analytics(&self, ctx: &DispatchContext<'_>) -> Result<DispatchOutcome> {
        let summary = self.services.analytics.summary(ctx.user_id).await?;
        Ok(DispatchOutcome::reply(render_analytics(&summary)))
    }

    pub(super) async fn list_suggestions(
        &self,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome> {
        let mut suggestions = self.suggestions.open_suggestions(ctx.user_id).await?;
        if suggestions.is_empty() {
            return Ok(DispatchOutcome::reply(
                "I don't have any new suggestions right now. I'll let you know when I spot an opportunity.",
            ));
        }
        sort_for_display(&mut suggestions);
        Ok(DispatchOutcome::reply(render_suggestions(&suggestions)))
    }

    /// Billing answers come back verbatim.
    pub(super) async fn billing(&self, ctx: &DispatchContext<'_>) -> Result<DispatchOutcome> {
        let answer = self.services.billing.answer(ctx.user_id, ctx.message).await?;
        Ok(DispatchOutcome::reply(answer))
    }
}

fn render_analytics(summary: &AnalyticsSummary) -> String {
    let mut out = format!(
        "Here's how your site did over the {}:\n- Visitors: {}\n- Page views: {}",
        summary.period, summary.visitors, summary.page_views
    );
    if !summary.top_pages.is_empty() {
        let pages: Vec<String> = summary
            .top_pages
            .iter()
            .map(|p| format!("{} ({} views)", p.path, p.views))
            .collect();
        out.push_str(&format!("\n- Top pages: {}", pages.join(", ")));
    }
    if !summary.top_referrers.is_empty() {
        let referrers: Vec<String> = summary
            .top_referrers
            .iter()
            .map(|r| format!("{} ({})", r.source, r.visits))
            .collect();
        out.push_str(&format!("\n- Top referrers: {}", referrers.join(", ")));
    }
    out
}

fn render_suggestions(suggestions: &[Suggestion]) -> String {
    let mut out = String::from("Here are a few ideas to grow your business:");
    for (i, s) in suggestions.iter().take(MAX_LISTED_SUGGESTIONS).enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, s.text));
    }
    out.push_str("\n\nJust say \"yes, let's do it\" to act on one.");
    out
}
