//! First-contact handling for users without a business profile.

pub mod gate;
pub mod prompts;
pub mod scraper;

pub use gate::OnboardingGate;
pub use scraper::LlmProfileScraper;
