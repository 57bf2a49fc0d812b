//! Reply text the dispatcher emits.
//!
//! The follow-up questions double as a protocol: turns written without a
//! flow marker are resumed by matching these strings (see `flow`), so the
//! wording of the `*_MARK` constants must not drift.

use crate::services::{PageSummary, PageType};

// ── Flow prompts ────────────────────────────────────────────────────

pub const EMBED_PAGE_MARK: &str = "Which page would you like to add the embed to?";
pub const EMBED_HTML_MARK: &str = "Please paste the full HTML embed code";
pub const DELETE_CONFIRM_MARK: &str = "Are you sure you want to delete";
pub const FAQ_DETAILS_MARK: &str = "what are some common questions your customers ask?";
pub const BLOG_DETAILS_MARK: &str = "what key points should the post focus on?";
pub const TESTIMONIAL_DETAILS_MARK: &str = "do you have any existing customer reviews";

pub fn embed_ask_page(pages: &[PageSummary]) -> String {
    format!("{EMBED_PAGE_MARK} Your pages: {}.", page_titles(pages))
}

pub fn embed_ask_html(page_title: &str) -> String {
    format!(
        "Got it, the embed will go on your \"{page_title}\" page. {EMBED_HTML_MARK} (for example an <iframe> or <script> snippet)."
    )
}

/// The user answered the HTML question with a page name instead.
pub fn embed_reconfirm_page(page_title: &str) -> String {
    format!(
        "That looks like a page name rather than embed code, so I'll use your \"{page_title}\" page. {EMBED_HTML_MARK} (for example an <iframe> or <script> snippet)."
    )
}

pub fn embed_added(page_title: &str) -> String {
    format!("Done! I added the embed to your \"{page_title}\" page.")
}

pub fn delete_confirm(page_title: &str) -> String {
    format!(
        "{DELETE_CONFIRM_MARK} the \"{page_title}\" page? This can't be undone. Reply \"yes, delete it\" to confirm."
    )
}

pub fn delete_cancelled(page_title: &str) -> String {
    format!("Okay, I'll keep your \"{page_title}\" page.")
}

/// Type-specific question asked before creating a suggested page.
pub fn page_details_question(page_type: PageType, title: &str) -> Option<String> {
    match page_type {
        PageType::Faq => Some(format!(
            "Great, let's build your \"{title}\" page! To get started, {FAQ_DETAILS_MARK}"
        )),
        PageType::Blog => Some(format!(
            "Great, let's write \"{title}\"! Before I draft it, {BLOG_DETAILS_MARK}"
        )),
        PageType::Testimonial => Some(format!(
            "Great, let's set up your \"{title}\" page! First, {TESTIMONIAL_DETAILS_MARK} you'd like to feature? Paste a few here."
        )),
        PageType::Standard => None,
    }
}

// ── Page replies ────────────────────────────────────────────────────

pub const ASK_PAGE_TITLE: &str = "What would you like to call the new page?";
pub const ASK_BLOG_TOPIC: &str = "What topic should the blog post cover?";
pub const NO_PAGES: &str =
    "You don't have any pages yet. Want me to build your website first? Just say \"create my website\".";

pub fn ask_which_page(action: &str, pages: &[PageSummary]) -> String {
    format!(
        "Which page would you like to {action}? Your pages: {}.",
        page_titles(pages)
    )
}

pub fn page_not_found(reference: &str, pages: &[PageSummary]) -> String {
    format!(
        "I couldn't find a page called \"{reference}\". Here are your current pages: {}.",
        page_titles(pages)
    )
}

pub fn ask_new_title(page_title: &str) -> String {
    format!("What should the new title for your \"{page_title}\" page be?")
}

pub fn ask_page_changes(page_title: &str) -> String {
    format!("What would you like to change on your \"{page_title}\" page?")
}

pub fn with_diff(summary: &str, diff: &crate::services::PageDiff) -> String {
    format!("{summary}\n\n{}", diff.render())
}

fn page_titles(pages: &[PageSummary]) -> String {
    if pages.is_empty() {
        return "(none)".to_string();
    }
    pages
        .iter()
        .map(|p| format!("{} ({})", p.title, p.slug))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Failures ────────────────────────────────────────────────────────

pub fn limit_reached(reason: &str) -> String {
    format!(
        "I can't do that just yet: {reason}. Upgrading your plan will unlock it, and I'm happy to help with anything else in the meantime."
    )
}

pub const GENERIC_FAILURE: &str =
    "Sorry, something went wrong on my end while working on that. Please try again in a moment.";

/// Returned when a turn fails before any handler could answer.
pub const FATAL_FALLBACK: &str =
    "I'm sorry, I ran into a problem processing your message. Please try again in a moment.";
