//! LLM-backed profile extraction from a website or a free-text description.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::prompts::extraction_system_prompt;
use crate::agent::intent::{extract_json_object, profile_update};
use crate::error::ScrapeError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::profile::{ContactInfo, ProfileUpdate};
use crate::services::ProfileScraper;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Page text passed to the model.
const MAX_PAGE_CHARS: usize = 8_000;

const EXTRACT_MAX_TOKENS: u32 = 1024;

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<!--.*?-->")
        .expect("script/style regex is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

pub struct LlmProfileScraper {
    http: reqwest::Client,
    llm: Arc<dyn LlmProvider>,
}

impl LlmProfileScraper {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("growth-assist/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { http, llm }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let fetch_err = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(strip_markup(&body))
    }

    async fn extract(&self, text: &str) -> Result<ProfileUpdate, ScrapeError> {
        let excerpt: String = text.chars().take(MAX_PAGE_CHARS).collect();
        let request = CompletionRequest::new(vec![
            ChatMessage::system(extraction_system_prompt()),
            ChatMessage::user(excerpt),
        ])
        .with_temperature(0.0)
        .with_max_tokens(EXTRACT_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        parse_profile_json(&response.content)
    }
}

#[async_trait]
impl ProfileScraper for LlmProfileScraper {
    async fn scrape_url(&self, url: &str) -> Result<ProfileUpdate, ScrapeError> {
        let text = self.fetch_text(url).await?;
        if text.is_empty() {
            return Err(ScrapeError::Empty(url.to_string()));
        }
        debug!(url, chars = text.len(), "Fetched website text");

        let mut update = self.extract(&text).await?;
        let contact = update.contact.get_or_insert_with(ContactInfo::default);
        if contact.website.is_none() {
            contact.website = Some(url.to_string());
        }
        Ok(update)
    }

    async fn extract_from_text(&self, text: &str) -> Result<ProfileUpdate, ScrapeError> {
        self.extract(text).await
    }
}

fn parse_profile_json(raw: &str) -> Result<ProfileUpdate, ScrapeError> {
    let json_str = extract_json_object(raw);
    match serde_json::from_str::<Value>(&json_str) {
        Ok(Value::Object(map)) => Ok(profile_update(&map)),
        Ok(other) => Err(ScrapeError::Extraction(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ScrapeError::Extraction(format!("JSON parse error: {e}"))),
    }
}

/// Visible text of an HTML document, whitespace collapsed.
pub fn strip_markup(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
