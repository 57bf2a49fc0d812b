//! Flow-state inference: where a multi-turn action left off.
//!
//! There is no session store. The dispatcher attaches a [`FlowState`] marker
//! to the metadata of the assistant turn that asks a follow-up question, and
//! the next turn recovers it from history. Turns written without metadata
//! are matched against the stable prompt text in [`super::prompts`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::prompts::{
    BLOG_DETAILS_MARK, DELETE_CONFIRM_MARK, EMBED_HTML_MARK, EMBED_PAGE_MARK, FAQ_DETAILS_MARK,
    TESTIMONIAL_DETAILS_MARK,
};
use super::text::first_quoted;
use crate::services::PageType;
use crate::store::{ConversationTurn, Role};

/// What the last assistant turn is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "awaiting", rename_all = "snake_case")]
pub enum FlowState {
    /// Asked which page should receive an embed.
    EmbedPage,
    /// Asked for the embed markup for a chosen page.
    EmbedHtml { page_slug: String, page_title: String },
    DeleteConfirmation { page_slug: String, page_title: String },
    /// Asked for type-specific detail before creating a suggested page.
    PageDetails {
        title: Option<String>,
        page_type: PageType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyword: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion_id: Option<String>,
    },
}

impl FlowState {
    /// Marker stored in turn metadata.
    pub fn to_metadata(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_metadata(metadata: &Value) -> Option<Self> {
        serde_json::from_value(metadata.clone()).ok()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EmbedPage => "embed_page",
            Self::EmbedHtml { .. } => "embed_html",
            Self::DeleteConfirmation { .. } => "delete_confirmation",
            Self::PageDetails { .. } => "page_details",
        }
    }
}

/// Recovers the open flow from the tail of a conversation.
pub struct FlowInferencer;

impl FlowInferencer {
    /// Inspect only the most recent assistant turn; older prompts are settled.
    pub fn infer(history: &[ConversationTurn]) -> Option<FlowState> {
        let last = history.iter().rev().find(|t| t.role == Role::Assistant)?;

        if let Some(state) = last.metadata.as_ref().and_then(FlowState::from_metadata) {
            return Some(state);
        }
        Self::from_text(&last.content)
    }

    /// Match the prose of an assistant turn against known follow-up prompts.
    pub fn from_text(content: &str) -> Option<FlowState> {
        let lower = content.to_lowercase();

        if content.contains(EMBED_HTML_MARK) {
            let title = first_quoted(content)?;
            return Some(FlowState::EmbedHtml {
                page_slug: title.clone(),
                page_title: title,
            });
        }
        if content.starts_with(EMBED_PAGE_MARK)
            || (lower.contains("which page") && lower.contains("embed"))
        {
            return Some(FlowState::EmbedPage);
        }
        if content.contains(DELETE_CONFIRM_MARK) {
            let title = first_quoted(content)?;
            return Some(FlowState::DeleteConfirmation {
                page_slug: title.clone(),
                page_title: title,
            });
        }

        let page_type = [
            (FAQ_DETAILS_MARK, PageType::Faq),
            (BLOG_DETAILS_MARK, PageType::Blog),
            (TESTIMONIAL_DETAILS_MARK, PageType::Testimonial),
        ]
        .into_iter()
        .find(|(mark, _)| lower.contains(mark))
        .map(|(_, t)| t)?;

        Some(FlowState::PageDetails {
            title: first_quoted(content),
            page_type,
            keyword: None,
            suggestion_id: None,
        })
    }
}
