//! Page composition handlers: create, rename, delete, edit, whole-site and
//! legal-page generation.

use tracing::debug;

use super::{ActionDispatcher, DispatchContext, DispatchOutcome, resolve_page};
use crate::agent::flow::FlowState;
use crate::agent::intent::CreatePageEntities;
use crate::agent::prompts;
use crate::agent::text::{is_affirmative, title_case};
use crate::error::{Result, ServiceError};
use crate::services::{CreatePageOptions, PageDiff, PageType, SchemaType};
use crate::suggestions::{Suggestion, match_affirmative, match_request};

impl ActionDispatcher {
    pub(super) async fn create_page(
        &self,
        ctx: &DispatchContext<'_>,
        entities: &CreatePageEntities,
    ) -> Result<DispatchOutcome> {
        // An open details question is answered by this turn unless it names
        // a different page.
        if let Some(flow @ FlowState::PageDetails { title, .. }) = ctx.flow
            && (entities.title.is_none() || entities.title == *title)
        {
            return self
                .complete_page_details(ctx, flow, entities.details.as_deref())
                .await;
        }

        let suggestions = self.open_suggestions(ctx.user_id).await;
        let matched = match entities.title.as_deref() {
            None if entities.page_type.is_none() && is_affirmative(ctx.message) => {
                match_affirmative(&suggestions)
            }
            title => match_request(&suggestions, title, entities.page_type),
        };
        if let Some(s) = matched {
            debug!(user_id = ctx.user_id, suggestion_id = %s.id, "Request matched open suggestion");
        }

        let page_type = entities
            .page_type
            .or_else(|| matched.and_then(|s| s.metadata.page_type));
        let keyword = entities
            .keyword
            .clone()
            .or_else(|| matched.and_then(|s| s.metadata.keyword.clone()));

        let title = match (&entities.title, matched, page_type) {
            (Some(title), _, _) => title.clone(),
            (None, Some(s), _) => suggestion_title(s),
            (None, None, Some(page_type)) => page_type.default_title().to_string(),
            (None, None, None) => return Ok(DispatchOutcome::reply(prompts::ASK_PAGE_TITLE)),
        };

        if let Some(s) = matched
            && entities.details.is_none()
            && let Some(page_type) = page_type
            && let Some(question) = prompts::page_details_question(page_type, &title)
        {
            return Ok(DispatchOutcome::awaiting(
                question,
                FlowState::PageDetails {
                    title: Some(title),
                    page_type,
                    keyword,
                    suggestion_id: Some(s.id.clone()),
                },
            ));
        }

        let options = CreatePageOptions {
            schema_type: page_type.map(SchemaType::from),
            keyword,
            details: entities.details.clone(),
            suggestion_id: matched.map(|s| s.id.clone()),
        };
        self.commit_page(ctx, &title, options).await
    }

    /// Create the page a details question was asked for.
    ///
    /// `details` comes from the classifier when it extracted them, otherwise
    /// the raw message is the answer.
    pub(super) async fn complete_page_details(
        &self,
        ctx: &DispatchContext<'_>,
        flow: &FlowState,
        details: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let FlowState::PageDetails {
            title,
            page_type,
            keyword,
            suggestion_id,
        } = flow
        else {
            return Err(ServiceError::InvalidInput(format!(
                "cannot complete page details from {} flow",
                flow.label()
            ))
            .into());
        };
        let title = title
            .clone()
            .unwrap_or_else(|| page_type.default_title().to_string());

        let details = details.unwrap_or(ctx.message).trim();
        if details.is_empty() {
            let question = prompts::page_details_question(*page_type, &title)
                .unwrap_or_else(|| prompts::ASK_PAGE_TITLE.to_string());
            return Ok(DispatchOutcome::awaiting(question, flow.clone()));
        }

        let options = CreatePageOptions {
            schema_type: Some(SchemaType::from(*page_type)),
            keyword: keyword.clone(),
            details: Some(details.to_string()),
            suggestion_id: suggestion_id.clone(),
        };
        self.commit_page(ctx, &title, options).await
    }

    async fn commit_page(
        &self,
        ctx: &DispatchContext<'_>,
        title: &str,
        options: CreatePageOptions,
    ) -> Result<DispatchOutcome> {
        let schema = options.schema_type;
        let diff = self
            .services
            .pages
            .create_page(ctx.user_id, title, ctx.profile, options)
            .await?;

        let mut summary = format!("Done! I created your \"{title}\" page.");
        if let Some(schema) = schema.filter(|s| *s != SchemaType::WebPage) {
            summary.push_str(&format!(
                " It's marked up as a {} so search engines can feature it.",
                schema.as_str()
            ));
        }
        Ok(DispatchOutcome::reply(prompts::with_diff(&summary, &diff)))
    }

    pub(super) async fn write_blog(
        &self,
        ctx: &DispatchContext<'_>,
        topic: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(DispatchOutcome::reply(prompts::ASK_BLOG_TOPIC));
        };
        let options = CreatePageOptions {
            schema_type: Some(SchemaType::Blog),
            keyword: Some(topic.to_lowercase()),
            details: None,
            suggestion_id: None,
        };
        self.commit_page(ctx, &title_case(topic), options).await
    }

    pub(super) async fn rename_page(
        &self,
        ctx: &DispatchContext<'_>,
        page: Option<&str>,
        new_title: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let pages = self.services.pages.list_pages(ctx.user_id).await?;
        if pages.is_empty() {
            return Ok(DispatchOutcome::reply(prompts::NO_PAGES));
        }
        let Some(reference) = page else {
            return Ok(DispatchOutcome::reply(prompts::ask_which_page(
                "rename", &pages,
            )));
        };
        let Some(target) = resolve_page(&pages, reference) else {
            return Ok(DispatchOutcome::reply(prompts::page_not_found(
                reference, &pages,
            )));
        };
        let Some(new_title) = new_title.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(DispatchOutcome::reply(prompts::ask_new_title(&target.title)));
        };

        let diff = self
            .services
            .pages
            .rename_page(ctx.user_id, &target.slug, new_title)
            .await?;
        let summary = format!("Renamed \"{}\" to \"{new_title}\".", target.title);
        Ok(DispatchOutcome::reply(prompts::with_diff(&summary, &diff)))
    }

    /// Destructive: runs only with an explicit confirmation, otherwise asks
    /// for one and changes nothing.
    pub(super) async fn delete_page(
        &self,
        ctx: &DispatchContext<'_>,
        page: Option<&str>,
        confirmed: bool,
    ) -> Result<DispatchOutcome> {
        let pages = self.services.pages.list_pages(ctx.user_id).await?;
        if pages.is_empty() {
            return Ok(DispatchOutcome::reply(prompts::NO_PAGES));
        }
        let pending = match ctx.flow {
            Some(FlowState::DeleteConfirmation { page_slug, .. }) => Some(page_slug.as_str()),
            _ => None,
        };
        let Some(reference) = page.or(pending) else {
            return Ok(DispatchOutcome::reply(prompts::ask_which_page(
                "delete", &pages,
            )));
        };
        let Some(target) = resolve_page(&pages, reference) else {
            return Ok(DispatchOutcome::reply(prompts::page_not_found(
                reference, &pages,
            )));
        };

        if !(confirmed || is_affirmative(ctx.message)) {
            return Ok(DispatchOutcome::awaiting(
                prompts::delete_confirm(&target.title),
                FlowState::DeleteConfirmation {
                    page_slug: target.slug.clone(),
                    page_title: target.title.clone(),
                },
            ));
        }
        self.commit_delete(ctx, &target.slug, &target.title).await
    }

    pub(super) async fn resume_delete(
        &self,
        ctx: &DispatchContext<'_>,
        page_slug: &str,
        page_title: &str,
    ) -> Result<DispatchOutcome> {
        if !is_affirmative(ctx.message) {
            return Ok(DispatchOutcome::reply(prompts::delete_cancelled(page_title)));
        }
        let pages = self.services.pages.list_pages(ctx.user_id).await?;
        match resolve_page(&pages, page_slug) {
            Some(target) => self.commit_delete(ctx, &target.slug, &target.title).await,
            None => Ok(DispatchOutcome::reply(prompts::page_not_found(
                page_title, &pages,
            ))),
        }
    }

    async fn commit_delete(
        &self,
        ctx: &DispatchContext<'_>,
        slug: &str,
        title: &str,
    ) -> Result<DispatchOutcome> {
        let diff = self.services.pages.delete_page(ctx.user_id, slug).await?;
        let summary = format!("Deleted your \"{title}\" page.");
        Ok(DispatchOutcome::reply(prompts::with_diff(&summary, &diff)))
    }

    pub(super) async fn update_page_content(
        &self,
        ctx: &DispatchContext<'_>,
        page: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let pages = self.services.pages.list_pages(ctx.user_id).await?;
        if pages.is_empty() {
            return Ok(DispatchOutcome::reply(prompts::NO_PAGES));
        }
        let Some(reference) = page else {
            return Ok(DispatchOutcome::reply(prompts::ask_which_page(
                "update", &pages,
            )));
        };
        let Some(target) = resolve_page(&pages, reference) else {
            return Ok(DispatchOutcome::reply(prompts::page_not_found(
                reference, &pages,
            )));
        };
        let Some(instructions) = instructions.map(str::trim).filter(|i| !i.is_empty()) else {
            return Ok(DispatchOutcome::reply(prompts::ask_page_changes(
                &target.title,
            )));
        };

        self.services
            .pages
            .update_page_content(ctx.user_id, &target.slug, instructions)
            .await?;
        Ok(DispatchOutcome::reply(format!(
            "Updated your \"{}\" page.",
            target.title
        )))
    }

    pub(super) async fn create_website(&self, ctx: &DispatchContext<'_>) -> Result<DispatchOutcome> {
        let diff = self
            .services
            .pages
            .create_website(ctx.user_id, ctx.profile)
            .await?;
        let summary = if diff.added().is_empty() {
            "Your website already has all of its starter pages.".to_string()
        } else {
            format!(
                "Your website for {} is ready! I built the starter pages from your business profile.",
                ctx.profile.business_name
            )
        };
        Ok(DispatchOutcome::reply(prompts::with_diff(&summary, &diff)))
    }

    pub(super) async fn generate_legal_pages(
        &self,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchOutcome> {
        let before = self.page_slugs(ctx.user_id).await?;
        self.services
            .legal
            .generate_legal_pages(ctx.user_id, ctx.profile)
            .await?;
        let after = self.page_slugs(ctx.user_id).await?;

        let diff = PageDiff::new(before, after);
        Ok(DispatchOutcome::reply(prompts::with_diff(
            "I've generated your privacy policy and terms of service.",
            &diff,
        )))
    }

    async fn page_slugs(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .services
            .pages
            .list_pages(user_id)
            .await?
            .into_iter()
            .map(|p| p.slug)
            .collect())
    }
}

/// Page title for an accepted suggestion.
fn suggestion_title(suggestion: &Suggestion) -> String {
    match (&suggestion.metadata.keyword, suggestion.metadata.page_type) {
        (Some(keyword), _) if !keyword.trim().is_empty() => title_case(keyword),
        (_, Some(page_type)) => page_type.default_title().to_string(),
        _ => PageType::Standard.default_title().to_string(),
    }
}
