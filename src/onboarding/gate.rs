//! Onboarding gate: answers every message from a user with no profile.
//!
//! Always settles in a single turn:
//! 1. URL in the message → scrape it; success creates the profile
//! 2. No URL, no business talk → ask whether a website exists
//! 3. No URL, business talk → extract a profile from the text itself
//!
//! Scrape and extraction failures become the manual-setup prompt. Only a
//! failure to persist the new profile is returned as an error.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use super::prompts;
use crate::error::{Result, ScrapeError};
use crate::profile::ProfileUpdate;
use crate::services::ProfileScraper;
use crate::store::ProfileStore;

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://[^\s<>]+|www\.[^\s<>]+|[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|co|biz|info|us|uk|ca|au|shop|store|site|app|dev|business)(?:/[^\s<>]*)?)",
    )
    .expect("url regex is valid")
});

static BUSINESS_TALK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(business|company|shop|store|restaurant|cafe|bakery|salon|studio|agency|clinic|practice|firm|llc|inc|services?|customers?|clients?|i (own|run|sell|offer|make)|we (sell|offer|make|provide|are))\b",
    )
    .expect("business regex is valid")
});

pub struct OnboardingGate {
    profiles: Arc<dyn ProfileStore>,
    scraper: Arc<dyn ProfileScraper>,
}

impl OnboardingGate {
    pub fn new(profiles: Arc<dyn ProfileStore>, scraper: Arc<dyn ProfileScraper>) -> Self {
        Self { profiles, scraper }
    }

    pub async fn handle(&self, user_id: &str, message: &str) -> Result<String> {
        if let Some(url) = find_url(message) {
            info!(user_id, url = %url, "Bootstrapping profile from website");
            let scraped = self.scraper.scrape_url(&url).await;
            return self.settle(user_id, scraped, true).await;
        }

        if !BUSINESS_TALK.is_match(message) {
            return Ok(prompts::ASK_FOR_WEBSITE.to_string());
        }

        info!(user_id, "Bootstrapping profile from description");
        let extracted = self.scraper.extract_from_text(message).await;
        self.settle(user_id, extracted, false).await
    }

    async fn settle(
        &self,
        user_id: &str,
        result: std::result::Result<ProfileUpdate, ScrapeError>,
        from_website: bool,
    ) -> Result<String> {
        let update = match result {
            Ok(update) if has_business_name(&update) => update,
            Ok(_) => {
                warn!(user_id, "Extraction found no business name");
                return Ok(prompts::MANUAL_SETUP.to_string());
            }
            Err(e) => {
                warn!(user_id, error = %e, "Profile extraction failed");
                return Ok(prompts::MANUAL_SETUP.to_string());
            }
        };

        let profile = self.profiles.create_profile(user_id, &update).await?;
        info!(user_id, business = %profile.business_name, "Profile created");
        Ok(prompts::profile_created(&profile, from_website))
    }
}

fn has_business_name(update: &ProfileUpdate) -> bool {
    update
        .business_name
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty())
}

/// First URL-looking token, normalised to an absolute `https` URL.
pub fn find_url(message: &str) -> Option<String> {
    let found = URL.find(message)?.as_str();
    let trimmed = found.trim_end_matches(['.', ',', ')', '!', '?', ';', ':', '"', '\'']);
    if trimmed.contains("://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryStore;

    struct FixedScraper {
        url_result: fn() -> std::result::Result<ProfileUpdate, ScrapeError>,
        text_result: fn() -> std::result::Result<ProfileUpdate, ScrapeError>,
    }

    #[async_trait]
    impl ProfileScraper for FixedScraper {
        async fn scrape_url(&self, _url: &str) -> std::result::Result<ProfileUpdate, ScrapeError> {
            (self.url_result)()
        }

        async fn extract_from_text(
            &self,
            _text: &str,
        ) -> std::result::Result<ProfileUpdate, ScrapeError> {
            (self.text_result)()
        }
    }

    fn named() -> std::result::Result<ProfileUpdate, ScrapeError> {
        Ok(ProfileUpdate {
            business_name: Some("Rosa's Bakery".into()),
            industry: Some("Bakery".into()),
            ..ProfileUpdate::default()
        })
    }

    fn unreachable_site() -> std::result::Result<ProfileUpdate, ScrapeError> {
        Err(ScrapeError::Fetch {
            url: "https://rosas.example.com".into(),
            reason: "connection refused".into(),
        })
    }

    fn nameless() -> std::result::Result<ProfileUpdate, ScrapeError> {
        Ok(ProfileUpdate::default())
    }

    fn gate(
        url_result: fn() -> std::result::Result<ProfileUpdate, ScrapeError>,
        text_result: fn() -> std::result::Result<ProfileUpdate, ScrapeError>,
    ) -> (OnboardingGate, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let scraper = Arc::new(FixedScraper {
            url_result,
            text_result,
        });
        (OnboardingGate::new(store.clone(), scraper), store)
    }

    #[test]
    fn url_detection() {
        assert_eq!(
            find_url("my site is https://rosas.example.com/home."),
            Some("https://rosas.example.com/home".into())
        );
        assert_eq!(
            find_url("check rosasbakery.com!"),
            Some("https://rosasbakery.com".into())
        );
        assert_eq!(find_url("www.rosas.biz"), Some("https://www.rosas.biz".into()));
        assert_eq!(find_url("hello there, e.g. nothing"), None);
    }

    #[tokio::test]
    async fn scraped_url_creates_profile() {
        let (gate, store) = gate(named, nameless);
        let reply = gate.handle("u1", "see rosasbakery.com").await.unwrap();
        assert!(reply.contains("Rosa's Bakery"));
        assert!(store.get_profile("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_scrape_asks_for_manual_setup() {
        let (gate, store) = gate(unreachable_site, named);
        let reply = gate.handle("u1", "https://rosas.example.com").await.unwrap();
        assert_eq!(reply, prompts::MANUAL_SETUP);
        assert!(store.get_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn small_talk_asks_about_a_website() {
        let (gate, store) = gate(named, named);
        let reply = gate.handle("u1", "hi there").await.unwrap();
        assert_eq!(reply, prompts::ASK_FOR_WEBSITE);
        assert!(store.get_profile("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn description_is_extracted() {
        let (gate, store) = gate(unreachable_site, named);
        let reply = gate
            .handle("u1", "I run a small bakery called Rosa's in Austin")
            .await
            .unwrap();
        assert!(reply.contains("from what you told me"));
        assert!(store.get_profile("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn description_without_name_falls_back() {
        let (gate, _store) = gate(named, nameless);
        let reply = gate.handle("u1", "we sell cakes").await.unwrap();
        assert_eq!(reply, prompts::MANUAL_SETUP);
    }
}
