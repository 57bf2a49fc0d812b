//! In-process site backend holding every user's pages in memory.
//!
//! Backs the CLI binary and the tests. Mutations return honest before/after
//! slug lists; an optional page limit produces `ServiceError::LimitReached`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    AnalyticsService, AnalyticsSummary, BillingService, CreatePageOptions, EmbedResult,
    LegalService, PageDiff, PageService, PageStat, PageSummary, SchemaType,
};
use crate::error::ServiceError;
use crate::profile::BusinessProfile;

/// A stored page.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPage {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub schema_type: SchemaType,
    pub keyword: Option<String>,
    pub embeds: Vec<String>,
}

/// In-memory implementation of every site-facing service.
#[derive(Default)]
pub struct MemorySite {
    pages: RwLock<HashMap<String, Vec<StoredPage>>>,
    page_limit: Option<usize>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject page creation once a user has `limit` pages.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Snapshot of a user's pages (for inspection in tests and the CLI).
    pub async fn pages(&self, user_id: &str) -> Vec<StoredPage> {
        self.pages
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a page directly, bypassing limits.
    pub async fn seed_page(&self, user_id: &str, title: &str) {
        let mut guard = self.pages.write().await;
        let pages = guard.entry(user_id.to_string()).or_default();
        pages.push(new_page(title, SchemaType::WebPage, None, String::new()));
    }

    async fn insert_pages(
        &self,
        user_id: &str,
        new_pages: Vec<StoredPage>,
        enforce_limit: bool,
    ) -> Result<PageDiff, ServiceError> {
        let mut guard = self.pages.write().await;
        let pages = guard.entry(user_id.to_string()).or_default();
        let before = slugs(pages);

        let fresh: Vec<StoredPage> = new_pages
            .into_iter()
            .filter(|p| !pages.iter().any(|existing| existing.slug == p.slug))
            .collect();

        if enforce_limit
            && let Some(limit) = self.page_limit
            && pages.len() + fresh.len() > limit
        {
            return Err(ServiceError::LimitReached(format!(
                "your plan includes up to {limit} pages"
            )));
        }

        pages.extend(fresh);
        Ok(PageDiff::new(before, slugs(pages)))
    }
}

fn slugs(pages: &[StoredPage]) -> Vec<String> {
    pages.iter().map(|p| p.slug.clone()).collect()
}

fn new_page(
    title: &str,
    schema_type: SchemaType,
    keyword: Option<String>,
    content: String,
) -> StoredPage {
    StoredPage {
        slug: slugify(title),
        title: title.to_string(),
        content,
        schema_type,
        keyword,
        embeds: Vec::new(),
    }
}

/// Lowercase, hyphen-separated slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "page".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl PageService for MemorySite {
    async fn list_pages(&self, user_id: &str) -> Result<Vec<PageSummary>, ServiceError> {
        Ok(self
            .pages(user_id)
            .await
            .into_iter()
            .map(|p| PageSummary {
                slug: p.slug,
                title: p.title,
            })
            .collect())
    }

    async fn create_page(
        &self,
        user_id: &str,
        title: &str,
        profile: &BusinessProfile,
        options: CreatePageOptions,
    ) -> Result<PageDiff, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidInput("page title is empty".into()));
        }
        let slug = slugify(title);
        if self.pages(user_id).await.iter().any(|p| p.slug == slug) {
            return Err(ServiceError::InvalidInput(format!(
                "a page called \"{title}\" already exists"
            )));
        }
        let content = format!(
            "{title} | {}\n\n{}",
            profile.business_name,
            options.details.clone().unwrap_or_default()
        );
        let page = new_page(
            title,
            options.schema_type.unwrap_or(SchemaType::WebPage),
            options.keyword,
            content,
        );
        debug!(user_id, slug = %page.slug, schema = page.schema_type.as_str(), "Creating page");
        self.insert_pages(user_id, vec![page], true).await
    }

    async fn rename_page(
        &self,
        user_id: &str,
        slug: &str,
        new_title: &str,
    ) -> Result<PageDiff, ServiceError> {
        let mut guard = self.pages.write().await;
        let pages = guard.entry(user_id.to_string()).or_default();
        let before = slugs(pages);
        let new_slug = slugify(new_title);
        if new_slug != slug && pages.iter().any(|p| p.slug == new_slug) {
            return Err(ServiceError::InvalidInput(format!(
                "a page called \"{new_title}\" already exists"
            )));
        }
        let page = pages
            .iter_mut()
            .find(|p| p.slug == slug)
            .ok_or_else(|| ServiceError::NotFound {
                entity: "page".into(),
                id: slug.to_string(),
            })?;
        page.title = new_title.trim().to_string();
        page.slug = new_slug;
        Ok(PageDiff::new(before, slugs(pages)))
    }

    async fn delete_page(&self, user_id: &str, slug: &str) -> Result<PageDiff, ServiceError> {
        let mut guard = self.pages.write().await;
        let pages = guard.entry(user_id.to_string()).or_default();
        let before = slugs(pages);
        let len = pages.len();
        pages.retain(|p| p.slug != slug);
        if pages.len() == len {
            return Err(ServiceError::NotFound {
                entity: "page".into(),
                id: slug.to_string(),
            });
        }
        Ok(PageDiff::new(before, slugs(pages)))
    }

    async fn add_embed(
        &self,
        user_id: &str,
        slug: &str,
        html: &str,
    ) -> Result<EmbedResult, ServiceError> {
        let mut guard = self.pages.write().await;
        let page = guard
            .get_mut(user_id)
            .and_then(|pages| pages.iter_mut().find(|p| p.slug == slug))
            .ok_or_else(|| ServiceError::NotFound {
                entity: "page".into(),
                id: slug.to_string(),
            })?;
        page.embeds.push(html.to_string());
        Ok(EmbedResult {
            page_title: page.title.clone(),
        })
    }

    async fn update_page_content(
        &self,
        user_id: &str,
        slug: &str,
        instructions: &str,
    ) -> Result<(), ServiceError> {
        let mut guard = self.pages.write().await;
        let page = guard
            .get_mut(user_id)
            .and_then(|pages| pages.iter_mut().find(|p| p.slug == slug))
            .ok_or_else(|| ServiceError::NotFound {
                entity: "page".into(),
                id: slug.to_string(),
            })?;
        page.content.push_str("\n\n");
        page.content.push_str(instructions);
        Ok(())
    }

    async fn create_website(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<PageDiff, ServiceError> {
        let mut starter = vec![
            new_page("Home", SchemaType::WebPage, None, profile.business_name.clone()),
            new_page("About", SchemaType::WebPage, None, String::new()),
        ];
        if !profile.services.is_empty() {
            starter.push(new_page("Services", SchemaType::WebPage, None, String::new()));
        }
        starter.push(new_page("Contact", SchemaType::WebPage, None, String::new()));
        self.insert_pages(user_id, starter, false).await
    }
}

#[async_trait]
impl LegalService for MemorySite {
    async fn generate_legal_pages(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<(), ServiceError> {
        let legal = vec![
            new_page(
                "Privacy Policy",
                SchemaType::WebPage,
                None,
                format!("Privacy policy for {}", profile.business_name),
            ),
            new_page(
                "Terms of Service",
                SchemaType::WebPage,
                None,
                format!("Terms of service for {}", profile.business_name),
            ),
        ];
        self.insert_pages(user_id, legal, false).await.map(|_| ())
    }
}

#[async_trait]
impl AnalyticsService for MemorySite {
    async fn summary(&self, user_id: &str) -> Result<AnalyticsSummary, ServiceError> {
        let pages = self.pages(user_id).await;
        Ok(AnalyticsSummary {
            visitors: 0,
            page_views: 0,
            top_pages: pages
                .iter()
                .take(5)
                .map(|p| PageStat {
                    path: format!("/{}", p.slug),
                    views: 0,
                })
                .collect(),
            top_referrers: Vec::new(),
            period: "last 30 days".to_string(),
        })
    }
}

#[async_trait]
impl BillingService for MemorySite {
    async fn answer(&self, _user_id: &str, _message: &str) -> Result<String, ServiceError> {
        Ok("You're on the free plan. You can upgrade any time from the billing page.".to_string())
    }
}
