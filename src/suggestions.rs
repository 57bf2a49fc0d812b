//! Proactive suggestions and how affirmative replies are matched to them.
//!
//! Suggestions are produced by a background generator and are read-only to
//! the engine. The dispatcher uses them to resolve follow-ups such as
//! "yes, let's do it" into a concrete page request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::PageType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    AhaMoment,
    GapAnalysis,
    GoalFraming,
    SeoOpportunity,
}

impl std::fmt::Display for SuggestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AhaMoment => "aha_moment",
            Self::GapAnalysis => "gap_analysis",
            Self::GoalFraming => "goal_framing",
            Self::SeoOpportunity => "seo_opportunity",
        };
        write!(f, "{s}")
    }
}

/// Ordered so that `High` sorts first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub id: String,
    pub text: String,
    pub category: SuggestionCategory,
    pub priority: SuggestionPriority,
    pub actionable: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: SuggestionMetadata,
}

impl Suggestion {
    pub fn new(
        text: impl Into<String>,
        category: SuggestionCategory,
        priority: SuggestionPriority,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            category,
            priority,
            actionable: true,
            created_at: Utc::now(),
            metadata: SuggestionMetadata::default(),
        }
    }

    pub fn with_page_type(mut self, page_type: PageType) -> Self {
        self.metadata.page_type = Some(page_type);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.metadata.keyword = Some(keyword.into());
        self
    }

    /// Whether accepting this suggestion means creating a page.
    pub fn proposes_page(&self) -> bool {
        self.actionable && self.metadata.page_type.is_some()
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `text` repeats a suggestion made within `window` of `now`.
pub fn is_duplicate(
    text: &str,
    recent: &[Suggestion],
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    let needle = normalize(text);
    let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::hours(24));
    recent
        .iter()
        .filter(|s| now.signed_duration_since(s.created_at) <= window)
        .any(|s| normalize(&s.text) == needle)
}

/// Order for presentation: priority, then newest first.
pub fn sort_for_display(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Pick the page-proposing suggestion an affirmative reply most likely accepts.
///
/// SEO opportunities win over other categories; within a category the most
/// recent suggestion wins.
pub fn match_affirmative(suggestions: &[Suggestion]) -> Option<&Suggestion> {
    suggestions
        .iter()
        .filter(|s| s.proposes_page())
        .max_by(|a, b| {
            let a_seo = a.category == SuggestionCategory::SeoOpportunity;
            let b_seo = b.category == SuggestionCategory::SeoOpportunity;
            a_seo
                .cmp(&b_seo)
                .then_with(|| a.created_at.cmp(&b.created_at))
        })
}

/// Find a page-proposing suggestion whose keyword or type matches a request.
pub fn match_request<'a>(
    suggestions: &'a [Suggestion],
    title: Option<&str>,
    page_type: Option<PageType>,
) -> Option<&'a Suggestion> {
    let title = title.map(normalize);
    suggestions.iter().filter(|s| s.proposes_page()).find(|s| {
        let keyword_hit = match (&title, s.metadata.keyword.as_deref()) {
            (Some(t), Some(k)) => {
                let k = normalize(k);
                !k.is_empty() && (t.contains(&k) || k.contains(t.as_str()))
            }
            _ => false,
        };
        let type_hit = page_type.is_some() && s.metadata.page_type == page_type;
        keyword_hit || type_hit
    })
}
