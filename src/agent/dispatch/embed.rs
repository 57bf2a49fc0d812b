//! The embed flow: pick a page, paste markup, commit.
//!
//! ```text
//! NoPage -> HavePage_NoHtml -> HavePage_HaveHtml -> Committed
//! ```
//!
//! Each step that stops early leaves a [`FlowState`] marker so the next turn
//! resumes where this one left off.

use super::{ActionDispatcher, DispatchContext, DispatchOutcome, resolve_page};
use crate::agent::flow::FlowState;
use crate::agent::prompts;
use crate::agent::text::{extract_embed_markup, looks_like_markup};
use crate::error::Result;
use crate::services::PageSummary;

impl ActionDispatcher {
    pub(super) async fn add_embed(
        &self,
        ctx: &DispatchContext<'_>,
        page: Option<&str>,
        html: Option<&str>,
    ) -> Result<DispatchOutcome> {
        // A bare follow-up to the HTML question is the answer to it.
        if page.is_none()
            && html.is_none()
            && let Some(FlowState::EmbedHtml {
                page_slug,
                page_title,
            }) = ctx.flow
        {
            return self.resume_embed_html(ctx, page_slug, page_title).await;
        }

        let pages = self.services.pages.list_pages(ctx.user_id).await?;
        if pages.is_empty() {
            return Ok(DispatchOutcome::reply(prompts::NO_PAGES));
        }

        let html = html
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .or_else(|| looks_like_markup(ctx.message).then(|| extract_embed_markup(ctx.message)));

        let reference = page.map(str::to_string).or_else(|| match ctx.flow {
            Some(FlowState::EmbedHtml { page_slug, .. }) => Some(page_slug.clone()),
            Some(FlowState::EmbedPage) => {
                resolve_page(&pages, ctx.message).map(|p| p.slug.clone())
            }
            _ => None,
        });

        let Some(reference) = reference else {
            return Ok(DispatchOutcome::awaiting(
                prompts::embed_ask_page(&pages),
                FlowState::EmbedPage,
            ));
        };
        let Some(target) = resolve_page(&pages, &reference) else {
            return Ok(DispatchOutcome::awaiting(
                prompts::page_not_found(&reference, &pages),
                FlowState::EmbedPage,
            ));
        };
        let Some(html) = html else {
            return Ok(ask_for_html(target, false));
        };
        self.commit_embed(ctx, target, &html).await
    }

    pub(super) async fn resume_embed_page(
        &self,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome> {
        self.add_embed(ctx, Some(ctx.message), None).await
    }

    /// The HTML question is open. A page name instead of code switches the
    /// target and re-asks; anything else is the markup for the pending page.
    pub(super) async fn resume_embed_html(
        &self,
        ctx: &DispatchContext<'_>,
        page_slug: &str,
        page_title: &str,
    ) -> Result<DispatchOutcome> {
        let pages = self.services.pages.list_pages(ctx.user_id).await?;

        if !looks_like_markup(ctx.message)
            && let Some(named) = resolve_page(&pages, ctx.message)
        {
            return Ok(ask_for_html(named, true));
        }

        let html = extract_embed_markup(ctx.message);
        if html.is_empty() {
            let same = PageSummary {
                slug: page_slug.to_string(),
                title: page_title.to_string(),
            };
            return Ok(ask_for_html(&same, false));
        }

        match resolve_page(&pages, page_slug) {
            Some(target) => self.commit_embed(ctx, target, &html).await,
            None => Ok(DispatchOutcome::awaiting(
                prompts::page_not_found(page_title, &pages),
                FlowState::EmbedPage,
            )),
        }
    }

    async fn commit_embed(
        &self,
        ctx: &DispatchContext<'_>,
        target: &PageSummary,
        html: &str,
    ) -> Result<DispatchOutcome> {
        let result = self
            .services
            .pages
            .add_embed(ctx.user_id, &target.slug, html)
            .await?;
        Ok(DispatchOutcome::reply(prompts::embed_added(&result.page_title)))
    }
}

fn ask_for_html(target: &PageSummary, reconfirm: bool) -> DispatchOutcome {
    let reply = if reconfirm {
        prompts::embed_reconfirm_page(&target.title)
    } else {
        prompts::embed_ask_html(&target.title)
    };
    DispatchOutcome::awaiting(
        reply,
        FlowState::EmbedHtml {
            page_slug: target.slug.clone(),
            page_title: target.title.clone(),
        },
    )
}
