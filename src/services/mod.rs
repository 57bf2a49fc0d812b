//! Contracts for the subsystems the dispatcher drives.
//!
//! Pages, legal pages, analytics, billing, and profile scraping are owned
//! elsewhere. The engine only sees these traits; `memory::MemorySite` is a
//! self-contained implementation used by the CLI and the tests.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ServiceError};
use crate::profile::{BusinessProfile, ProfileUpdate};

pub use memory::MemorySite;

// ── Page types ──────────────────────────────────────────────────────

/// A page as listed to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSummary {
    pub slug: String,
    pub title: String,
}

/// Page identifiers before and after a mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDiff {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

impl PageDiff {
    pub fn new(before: Vec<String>, after: Vec<String>) -> Self {
        Self { before, after }
    }

    /// Identifiers present after but not before.
    pub fn added(&self) -> Vec<&str> {
        self.after
            .iter()
            .filter(|id| !self.before.contains(id))
            .map(String::as_str)
            .collect()
    }

    /// Identifiers present before but not after.
    pub fn removed(&self) -> Vec<&str> {
        self.before
            .iter()
            .filter(|id| !self.after.contains(id))
            .map(String::as_str)
            .collect()
    }

    /// Two-line rendering appended to mutation confirmations.
    pub fn render(&self) -> String {
        format!(
            "Pages before: {}\nPages now: {}",
            render_list(&self.before),
            render_list(&self.after)
        )
    }
}

fn render_list(ids: &[String]) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.join(", ")
    }
}

/// Kind of page a suggestion or request asks for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Faq,
    Blog,
    Testimonial,
    Standard,
}

impl PageType {
    /// Lenient parse of classifier / suggestion metadata values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "faq" | "faqs" | "faq_page" | "questions" => Some(Self::Faq),
            "blog" | "blog_post" | "article" | "post" => Some(Self::Blog),
            "testimonial" | "testimonials" | "review" | "reviews" => Some(Self::Testimonial),
            "page" | "standard" | "web_page" | "webpage" | "landing" => Some(Self::Standard),
            _ => None,
        }
    }

    /// Title used when nothing more specific is known.
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Faq => "Frequently Asked Questions",
            Self::Blog => "Blog",
            Self::Testimonial => "Testimonials",
            Self::Standard => "New Page",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Faq => write!(f, "faq"),
            Self::Blog => write!(f, "blog"),
            Self::Testimonial => write!(f, "testimonial"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Schema.org structured-data type attached to a created page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchemaType {
    #[serde(rename = "FAQPage")]
    FaqPage,
    Blog,
    Review,
    WebPage,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FaqPage => "FAQPage",
            Self::Blog => "Blog",
            Self::Review => "Review",
            Self::WebPage => "WebPage",
        }
    }
}

impl From<PageType> for SchemaType {
    fn from(page_type: PageType) -> Self {
        match page_type {
            PageType::Faq => Self::FaqPage,
            PageType::Blog => Self::Blog,
            PageType::Testimonial => Self::Review,
            PageType::Standard => Self::WebPage,
        }
    }
}

/// Extra inputs for page creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatePageOptions {
    pub schema_type: Option<SchemaType>,
    pub keyword: Option<String>,
    /// Free-text detail the user supplied (questions, focus points, reviews).
    pub details: Option<String>,
    /// Suggestion this page fulfils.
    pub suggestion_id: Option<String>,
}

/// Result of inserting an embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedResult {
    pub page_title: String,
}

// ── Analytics ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageStat {
    pub path: String,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferrerStat {
    pub source: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyticsSummary {
    pub visitors: u64,
    pub page_views: u64,
    pub top_pages: Vec<PageStat>,
    pub top_referrers: Vec<ReferrerStat>,
    /// Human-readable period, e.g. "last 30 days".
    pub period: String,
}

// ── Service traits ──────────────────────────────────────────────────

/// Website page operations.
#[async_trait]
pub trait PageService: Send + Sync {
    async fn list_pages(&self, user_id: &str) -> Result<Vec<PageSummary>, ServiceError>;

    async fn create_page(
        &self,
        user_id: &str,
        title: &str,
        profile: &BusinessProfile,
        options: CreatePageOptions,
    ) -> Result<PageDiff, ServiceError>;

    async fn rename_page(
        &self,
        user_id: &str,
        slug: &str,
        new_title: &str,
    ) -> Result<PageDiff, ServiceError>;

    async fn delete_page(&self, user_id: &str, slug: &str) -> Result<PageDiff, ServiceError>;

    async fn add_embed(
        &self,
        user_id: &str,
        slug: &str,
        html: &str,
    ) -> Result<EmbedResult, ServiceError>;

    async fn update_page_content(
        &self,
        user_id: &str,
        slug: &str,
        instructions: &str,
    ) -> Result<(), ServiceError>;

    /// Generate the starter site from the profile.
    async fn create_website(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<PageDiff, ServiceError>;
}

/// Privacy policy / terms generation.
#[async_trait]
pub trait LegalService: Send + Sync {
    async fn generate_legal_pages(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
    ) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AnalyticsService: Send + Sync {
    async fn summary(&self, user_id: &str) -> Result<AnalyticsSummary, ServiceError>;
}

/// Billing questions are answered verbatim by the billing subsystem.
#[async_trait]
pub trait BillingService: Send + Sync {
    async fn answer(&self, user_id: &str, message: &str) -> Result<String, ServiceError>;
}

/// Derives a partial profile from a website or a free-text description.
#[async_trait]
pub trait ProfileScraper: Send + Sync {
    async fn scrape_url(&self, url: &str) -> Result<ProfileUpdate, ScrapeError>;

    async fn extract_from_text(&self, text: &str) -> Result<ProfileUpdate, ScrapeError>;
}

/// The subsystem handles the dispatcher is built with.
#[derive(Clone)]
pub struct Services {
    pub pages: Arc<dyn PageService>,
    pub legal: Arc<dyn LegalService>,
    pub analytics: Arc<dyn AnalyticsService>,
    pub billing: Arc<dyn BillingService>,
}

impl Services {
    /// Use one `MemorySite` for every subsystem.
    pub fn from_memory(site: Arc<MemorySite>) -> Self {
        Self {
            pages: site.clone(),
            legal: site.clone(),
            analytics: site.clone(),
            billing: site,
        }
    }
}
