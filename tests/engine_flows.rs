//! End-to-end turn handling through `Engine::process_message`.
//!
//! Every test builds the engine from in-memory stores and a scripted
//! classifier, then checks replies, persisted turns, and site state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use growth_assist::agent::intent::{CreatePageEntities, FALLBACK_CLARIFICATION};
use growth_assist::agent::prompts::{
    self, DELETE_CONFIRM_MARK, EMBED_HTML_MARK, EMBED_PAGE_MARK, FAQ_DETAILS_MARK,
};
use growth_assist::agent::{
    Engine, EngineDeps, FlowState, Intent, IntentClassifier, IntentResult, LlmIntentClassifier,
};
use growth_assist::config::EngineConfig;
use growth_assist::error::{DatabaseError, LlmError, ScrapeError};
use growth_assist::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use growth_assist::onboarding::prompts::MANUAL_SETUP;
use growth_assist::profile::{BusinessProfile, ProfileUpdate};
use growth_assist::services::{MemorySite, PageType, ProfileScraper, SchemaType, Services};
use growth_assist::store::{
    ConversationTurn, HistoryStore, MemoryStore, ProfileStore, Role, SuggestionStore,
};
use growth_assist::suggestions::{Suggestion, SuggestionCategory, SuggestionPriority};

const USER: &str = "rosa";

// ── Fakes ───────────────────────────────────────────────────────────

/// Returns queued results in order, then falls back.
#[derive(Default)]
struct ScriptedClassifier {
    queue: Mutex<VecDeque<IntentResult>>,
    seen_history: Mutex<Vec<Vec<ConversationTurn>>>,
    delay: Option<Duration>,
}

impl ScriptedClassifier {
    fn new(results: Vec<IntentResult>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(results.into()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _message: &str,
        history: &[ConversationTurn],
        _profile: Option<&BusinessProfile>,
    ) -> IntentResult {
        self.seen_history.lock().unwrap().push(history.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(IntentResult::fallback)
    }
}

/// Completion model that always answers with the same text.
struct CannedLlm(String);

#[async_trait]
impl LlmProvider for CannedLlm {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.0.clone(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

struct FailingScraper;

#[async_trait]
impl ProfileScraper for FailingScraper {
    async fn scrape_url(&self, url: &str) -> Result<ProfileUpdate, ScrapeError> {
        Err(ScrapeError::Fetch {
            url: url.to_string(),
            reason: "connection refused".into(),
        })
    }

    async fn extract_from_text(&self, _text: &str) -> Result<ProfileUpdate, ScrapeError> {
        Err(ScrapeError::Extraction("no business found".into()))
    }
}

/// Wraps a `MemoryStore`; reads, writes, or metadata can be sabotaged.
struct FlakyHistory {
    inner: Arc<MemoryStore>,
    fail_reads: bool,
    fail_writes: bool,
    fail_user_writes: bool,
    drop_metadata: bool,
}

impl FlakyHistory {
    fn over(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_writes: false,
            fail_user_writes: false,
            drop_metadata: false,
        }
    }
}

#[async_trait]
impl HistoryStore for FlakyHistory {
    async fn append(
        &self,
        user_id: &str,
        role: Role,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), DatabaseError> {
        if self.fail_writes || (self.fail_user_writes && role == Role::User) {
            return Err(DatabaseError::Query("database is locked".into()));
        }
        let metadata = if self.drop_metadata { None } else { metadata };
        self.inner.append(user_id, role, content, metadata).await
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, DatabaseError> {
        if self.fail_reads {
            return Err(DatabaseError::Query("no such table: conversation_turns".into()));
        }
        self.inner.recent(user_id, limit).await
    }
}

/// Profile store whose reads always fail.
struct BrokenProfiles;

#[async_trait]
impl ProfileStore for BrokenProfiles {
    async fn get_profile(&self, _user_id: &str) -> Result<Option<BusinessProfile>, DatabaseError> {
        Err(DatabaseError::Pool("connection reset".into()))
    }

    async fn create_profile(
        &self,
        _user_id: &str,
        _partial: &ProfileUpdate,
    ) -> Result<BusinessProfile, DatabaseError> {
        Err(DatabaseError::Pool("connection reset".into()))
    }

    async fn update_profile(
        &self,
        _user_id: &str,
        _partial: &ProfileUpdate,
    ) -> Result<(), DatabaseError> {
        Err(DatabaseError::Pool("connection reset".into()))
    }
}

// ── Harness ─────────────────────────────────────────────────────────

struct Harness {
    engine: Engine,
    store: Arc<MemoryStore>,
    site: Arc<MemorySite>,
}

struct HarnessBuilder {
    classifier: Arc<dyn IntentClassifier>,
    store: Arc<MemoryStore>,
    history: Option<Arc<dyn HistoryStore>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    site: MemorySite,
    with_profile: bool,
}

impl HarnessBuilder {
    fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            classifier,
            store: Arc::new(MemoryStore::new()),
            history: None,
            profiles: None,
            site: MemorySite::new(),
            with_profile: true,
        }
    }

    fn without_profile(mut self) -> Self {
        self.with_profile = false;
        self
    }

    fn site(mut self, site: MemorySite) -> Self {
        self.site = site;
        self
    }

    fn history(mut self, build: impl FnOnce(Arc<MemoryStore>) -> FlakyHistory) -> Self {
        self.history = Some(Arc::new(build(self.store.clone())));
        self
    }

    fn profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    async fn build(self) -> Harness {
        if self.with_profile {
            self.store
                .put_profile(USER, BusinessProfile::new("Rosa's Bakery"))
                .await;
        }
        let site = Arc::new(self.site);
        let engine = Engine::new(
            EngineConfig::default(),
            EngineDeps {
                history: self
                    .history
                    .unwrap_or_else(|| self.store.clone() as Arc<dyn HistoryStore>),
                profiles: self
                    .profiles
                    .unwrap_or_else(|| self.store.clone() as Arc<dyn ProfileStore>),
                suggestions: self.store.clone(),
                classifier: self.classifier,
                scraper: Arc::new(FailingScraper),
                services: Services::from_memory(site.clone()),
            },
        );
        Harness {
            engine,
            store: self.store,
            site,
        }
    }
}

fn confident(intent: Intent) -> IntentResult {
    IntentResult {
        intent,
        needs_clarification: false,
        clarification: None,
        confidence: 0.9,
    }
}

async fn seeded_site(titles: &[&str]) -> MemorySite {
    let site = MemorySite::new();
    for title in titles {
        site.seed_page(USER, title).await;
    }
    site
}

fn roles(turns: &[ConversationTurn]) -> Vec<Role> {
    turns.iter().map(|t| t.role).collect()
}

fn diff_lines(reply: &str) -> (Vec<String>, Vec<String>) {
    let list = |prefix: &str| -> Vec<String> {
        reply
            .lines()
            .find_map(|l| l.strip_prefix(prefix))
            .map(|rest| {
                rest.split(", ")
                    .filter(|s| *s != "(none)")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    (list("Pages before: "), list("Pages now: "))
}

// ── Pairing invariant ───────────────────────────────────────────────

#[tokio::test]
async fn every_turn_appends_user_then_assistant() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::GetAnalytics)]);
    let h = HarnessBuilder::new(classifier).build().await;

    let reply = h.engine.process_message(USER, "how is my site doing?").await;

    assert!(reply.starts_with("Here's how your site did"));
    let turns = h.store.all_turns(USER).await;
    assert_eq!(roles(&turns), vec![Role::User, Role::Assistant]);
    assert_eq!(turns[0].content, "how is my site doing?");
    assert_eq!(turns[1].content, reply);
}

#[tokio::test]
async fn history_load_failure_still_logs_the_pair() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::GetAnalytics)]);
    let h = HarnessBuilder::new(classifier)
        .history(|store| FlakyHistory {
            fail_reads: true,
            ..FlakyHistory::over(store)
        })
        .build()
        .await;

    let reply = h.engine.process_message(USER, "hello").await;

    assert_eq!(reply, prompts::FATAL_FALLBACK);
    let turns = h.store.all_turns(USER).await;
    assert_eq!(roles(&turns), vec![Role::User, Role::Assistant]);
    assert_eq!(turns[1].content, prompts::FATAL_FALLBACK);
}

#[tokio::test]
async fn profile_load_failure_still_logs_the_pair() {
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier)
        .profiles(Arc::new(BrokenProfiles))
        .build()
        .await;

    let reply = h.engine.process_message(USER, "hello").await;

    assert_eq!(reply, prompts::FATAL_FALLBACK);
    assert_eq!(
        roles(&h.store.all_turns(USER).await),
        vec![Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn dropped_history_writes_never_reach_the_caller() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::GetAnalytics)]);
    let h = HarnessBuilder::new(classifier)
        .history(|store| FlakyHistory {
            fail_writes: true,
            ..FlakyHistory::over(store)
        })
        .build()
        .await;

    let reply = h.engine.process_message(USER, "traffic?").await;

    assert!(reply.starts_with("Here's how your site did"));
    assert_eq!(h.engine.failed_history_writes(), 2);
}

#[tokio::test]
async fn concurrent_turns_for_one_user_stay_paired() {
    let classifier = Arc::new(ScriptedClassifier {
        delay: Some(Duration::from_millis(30)),
        ..ScriptedClassifier::default()
    });
    let h = HarnessBuilder::new(classifier).build().await;

    tokio::join!(
        h.engine.process_message(USER, "first"),
        h.engine.process_message(USER, "second"),
    );

    let turns = h.store.all_turns(USER).await;
    assert_eq!(
        roles(&turns),
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn classifier_sees_prior_turns_but_not_the_current_message() {
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier.clone()).build().await;

    h.engine.process_message(USER, "hi").await;
    h.engine.process_message(USER, "hi again").await;

    let seen = classifier.seen_history.lock().unwrap();
    assert!(seen[0].is_empty());
    assert_eq!(seen[1].len(), 2);
    assert_eq!(seen[1][0].content, "hi");
    assert_eq!(seen[1][1].role, Role::Assistant);
}

#[tokio::test]
async fn unlogged_message_leaves_an_identical_earlier_turn_in_history() {
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier.clone())
        .history(|store| FlakyHistory {
            fail_user_writes: true,
            ..FlakyHistory::over(store)
        })
        .build()
        .await;
    // An earlier "hi" whose reply was never stored.
    h.store.append(USER, Role::User, "hi", None).await.unwrap();

    h.engine.process_message(USER, "hi").await;

    let seen = classifier.seen_history.lock().unwrap();
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].content, "hi");
    assert_eq!(h.engine.failed_history_writes(), 1);
}

// ── Classifier fallback ─────────────────────────────────────────────

#[tokio::test]
async fn malformed_classifier_output_never_breaks_a_turn() {
    for raw in [
        "",
        "Sure! The user wants a page.",
        r#"{"entities": {"title": "FAQ"}}"#,
        r#"{"intent": "CREATE_PAGE"}"#,
        r#"{"intent": "MAKE_COFFEE", "confidence": 0.99}"#,
    ] {
        let llm: Arc<dyn LlmProvider> = Arc::new(CannedLlm(raw.to_string()));
        let classifier = Arc::new(LlmIntentClassifier::new(llm, 20));
        let h = HarnessBuilder::new(classifier).build().await;

        let reply = h.engine.process_message(USER, "make me a page").await;

        assert_eq!(reply, FALLBACK_CLARIFICATION, "raw output: {raw:?}");
        assert_eq!(h.store.all_turns(USER).await.len(), 2);
        assert!(h.site.pages(USER).await.is_empty());
    }
}

#[tokio::test]
async fn low_confidence_asks_the_classifier_question() {
    let classifier = ScriptedClassifier::new(vec![IntentResult {
        intent: Intent::GenerateLegalPages,
        needs_clarification: false,
        clarification: Some("Do you want a privacy policy, terms, or both?".into()),
        confidence: 0.3,
    }]);
    let h = HarnessBuilder::new(classifier).build().await;

    let reply = h.engine.process_message(USER, "legal stuff").await;

    assert_eq!(reply, "Do you want a privacy policy, terms, or both?");
    assert!(h.site.pages(USER).await.is_empty());
}

// ── Delete confirmation ─────────────────────────────────────────────

#[tokio::test]
async fn unconfirmed_delete_reasks_identically_and_mutates_nothing() {
    let unconfirmed = || {
        confident(Intent::DeletePage {
            page: Some("about".into()),
            confirmed: false,
        })
    };
    let classifier = ScriptedClassifier::new(vec![unconfirmed(), unconfirmed()]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "About"]).await)
        .build()
        .await;

    let first = h.engine.process_message(USER, "delete the about page").await;
    let second = h.engine.process_message(USER, "delete the about page").await;

    assert!(first.starts_with(DELETE_CONFIRM_MARK));
    assert_eq!(first, second);
    assert_eq!(h.site.pages(USER).await.len(), 2);
}

#[tokio::test]
async fn affirmative_reply_completes_a_pending_delete() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::DeletePage {
        page: Some("About".into()),
        confirmed: false,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "About"]).await)
        .build()
        .await;

    h.engine.process_message(USER, "remove about").await;
    let reply = h.engine.process_message(USER, "yes, delete it").await;

    assert!(reply.starts_with("Deleted your \"About\" page."));
    let (before, after) = diff_lines(&reply);
    assert_eq!(before, vec!["home", "about"]);
    assert_eq!(after, vec!["home"]);
}

#[tokio::test]
async fn declining_a_pending_delete_keeps_the_page() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::DeletePage {
        page: Some("about".into()),
        confirmed: false,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["About"]).await)
        .build()
        .await;

    h.engine.process_message(USER, "delete about").await;
    let reply = h.engine.process_message(USER, "no, keep it").await;

    assert_eq!(reply, prompts::delete_cancelled("About"));
    assert_eq!(h.site.pages(USER).await.len(), 1);
}

// ── Page composition ────────────────────────────────────────────────

#[tokio::test]
async fn created_page_diff_is_before_plus_new_page() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::CreatePage(
        CreatePageEntities {
            title: Some("Catering Menu".into()),
            ..CreatePageEntities::default()
        },
    ))]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "About"]).await)
        .build()
        .await;

    let reply = h
        .engine
        .process_message(USER, "add a catering menu page")
        .await;

    let (before, after) = diff_lines(&reply);
    let mut expected = before.clone();
    expected.push("catering-menu".into());
    let mut sorted_after = after.clone();
    sorted_after.sort();
    sorted_after.dedup();
    expected.sort();
    assert_eq!(sorted_after, expected);
    assert_eq!(after.len(), before.len() + 1);
}

#[tokio::test]
async fn plan_limit_is_explained_not_apologized_for() {
    let site = MemorySite::new().with_page_limit(1);
    site.seed_page(USER, "Home").await;
    let classifier = ScriptedClassifier::new(vec![confident(Intent::CreatePage(
        CreatePageEntities {
            title: Some("Gallery".into()),
            ..CreatePageEntities::default()
        },
    ))]);
    let h = HarnessBuilder::new(classifier).site(site).build().await;

    let reply = h.engine.process_message(USER, "add a gallery").await;

    assert!(reply.starts_with("I can't do that just yet"));
    assert!(reply.contains("up to 1 pages"));
    assert_eq!(h.site.pages(USER).await.len(), 1);
}

#[tokio::test]
async fn unknown_page_reference_lists_every_page() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::RenamePage {
        page: Some("Blog".into()),
        new_title: Some("News".into()),
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .build()
        .await;

    let reply = h.engine.process_message(USER, "rename blog to news").await;

    assert_eq!(
        reply,
        "I couldn't find a page called \"Blog\". Here are your current pages: Home (home), Contact (contact)."
    );
}

#[tokio::test]
async fn subsystem_failure_gets_the_generic_apology() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::RenamePage {
        page: Some("about".into()),
        new_title: Some("Contact".into()),
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["About", "Contact"]).await)
        .build()
        .await;

    let reply = h
        .engine
        .process_message(USER, "rename the about page to Contact")
        .await;

    assert_eq!(reply, prompts::GENERIC_FAILURE);
    let titles: Vec<String> = h
        .site
        .pages(USER)
        .await
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["About", "Contact"]);
    let turns = h.store.all_turns(USER).await;
    assert_eq!(roles(&turns), vec![Role::User, Role::Assistant]);
    assert_eq!(turns[1].content, prompts::GENERIC_FAILURE);
}

#[tokio::test]
async fn legal_pages_report_their_diff() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::GenerateLegalPages)]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home"]).await)
        .build()
        .await;

    let reply = h.engine.process_message(USER, "I need a privacy policy").await;

    let (before, after) = diff_lines(&reply);
    assert_eq!(before, vec!["home"]);
    assert_eq!(after, vec!["home", "privacy-policy", "terms-of-service"]);
}

// ── Embed flow ──────────────────────────────────────────────────────

const PASTE: &str = "Here it is: <iframe src=\"https://cal.example.com/rosa\" width=\"100%\"></iframe> thanks!";
const IFRAME: &str = "<iframe src=\"https://cal.example.com/rosa\" width=\"100%\"></iframe>";

async fn run_embed_flow(h: &Harness) {
    let first = h.engine.process_message(USER, "add an embed").await;
    assert!(first.starts_with(EMBED_PAGE_MARK), "got: {first}");

    let second = h.engine.process_message(USER, "the contact page").await;
    assert!(second.contains(EMBED_HTML_MARK), "got: {second}");
    assert!(second.contains("\"Contact\""));

    let third = h.engine.process_message(USER, PASTE).await;
    assert_eq!(third, prompts::embed_added("Contact"));

    let pages = h.site.pages(USER).await;
    let contact = pages.iter().find(|p| p.slug == "contact").unwrap();
    assert_eq!(contact.embeds, vec![IFRAME.to_string()]);
}

#[tokio::test]
async fn embed_flow_progresses_over_three_turns() {
    // Only the opening turn is classified; the rest resume the open flow.
    let classifier = ScriptedClassifier::new(vec![confident(Intent::AddEmbed {
        page: None,
        html: None,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .build()
        .await;

    run_embed_flow(&h).await;

    let turns = h.store.all_turns(USER).await;
    assert_eq!(turns.len(), 6);
    assert_eq!(
        turns[3].metadata.as_ref().and_then(FlowState::from_metadata),
        Some(FlowState::EmbedHtml {
            page_slug: "contact".into(),
            page_title: "Contact".into(),
        })
    );
    assert!(turns[5].metadata.is_none());
}

#[tokio::test]
async fn embed_flow_resumes_from_prompt_text_without_markers() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::AddEmbed {
        page: None,
        html: None,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .history(|store| FlakyHistory {
            drop_metadata: true,
            ..FlakyHistory::over(store)
        })
        .build()
        .await;

    run_embed_flow(&h).await;
}

#[tokio::test]
async fn embed_flow_with_classified_follow_ups() {
    let classifier = ScriptedClassifier::new(vec![
        confident(Intent::AddEmbed {
            page: None,
            html: None,
        }),
        confident(Intent::AddEmbed {
            page: Some("contact".into()),
            html: None,
        }),
        confident(Intent::AddEmbed {
            page: None,
            html: None,
        }),
    ]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .build()
        .await;

    run_embed_flow(&h).await;
}

#[tokio::test]
async fn page_name_instead_of_html_reconfirms() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::AddEmbed {
        page: Some("home".into()),
        html: None,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .build()
        .await;

    h.engine.process_message(USER, "embed something on home").await;
    let reply = h.engine.process_message(USER, "contact").await;

    assert_eq!(reply, prompts::embed_reconfirm_page("Contact"));
    let reply = h.engine.process_message(USER, PASTE).await;
    assert_eq!(reply, prompts::embed_added("Contact"));
}

#[tokio::test]
async fn any_snippet_answers_the_html_question() {
    const BADGE: &str = r#"<img src="https://badges.example.com/reviews.png" alt="5 stars">"#;
    let classifier = ScriptedClassifier::new(vec![confident(Intent::AddEmbed {
        page: Some("contact".into()),
        html: None,
    })]);
    let h = HarnessBuilder::new(classifier)
        .site(seeded_site(&["Home", "Contact"]).await)
        .build()
        .await;

    let ask = h.engine.process_message(USER, "add a badge to contact").await;
    assert!(ask.contains(EMBED_HTML_MARK), "got: {ask}");

    let reply = h.engine.process_message(USER, &format!("  {BADGE}\n")).await;

    assert_eq!(reply, prompts::embed_added("Contact"));
    let pages = h.site.pages(USER).await;
    let contact = pages.iter().find(|p| p.slug == "contact").unwrap();
    assert_eq!(contact.embeds, vec![BADGE.to_string()]);
}

// ── Onboarding ──────────────────────────────────────────────────────

#[tokio::test]
async fn failed_url_extraction_asks_for_manual_setup() {
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier.clone())
        .without_profile()
        .build()
        .await;

    let reply = h
        .engine
        .process_message(USER, "my website is https://rosas-bakery.example.com")
        .await;

    assert_eq!(reply, MANUAL_SETUP);
    assert!(h.store.get_profile(USER).await.unwrap().is_none());
    assert_eq!(h.store.all_turns(USER).await.len(), 2);
    assert!(classifier.seen_history.lock().unwrap().is_empty());
}

// ── Suggestions ─────────────────────────────────────────────────────

async fn offer_faq(store: &MemoryStore) {
    let suggestion = Suggestion::new(
        "People search for \"bakery faq\". Want an FAQ page?",
        SuggestionCategory::SeoOpportunity,
        SuggestionPriority::High,
    )
    .with_page_type(PageType::Faq)
    .with_keyword("bakery faq");
    store
        .add_suggestion(USER, &suggestion, Duration::from_secs(86_400))
        .await
        .unwrap();
}

#[tokio::test]
async fn accepted_faq_suggestion_asks_for_questions_then_creates_faq_page() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::CreatePage(
        CreatePageEntities::default(),
    ))]);
    let h = HarnessBuilder::new(classifier).build().await;
    offer_faq(&h.store).await;

    let question = h.engine.process_message(USER, "yes let's do it").await;
    assert!(question.contains(FAQ_DETAILS_MARK), "got: {question}");
    assert!(h.site.pages(USER).await.is_empty());

    let reply = h
        .engine
        .process_message(USER, "Do you deliver? Are your cakes gluten free?")
        .await;

    let pages = h.site.pages(USER).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].schema_type, SchemaType::FaqPage);
    assert_eq!(pages[0].title, "Bakery Faq");
    assert!(pages[0].content.contains("gluten free"));
    assert!(reply.contains("FAQPage"));
}

#[tokio::test]
async fn faq_details_extracted_by_the_classifier_also_complete_the_page() {
    let classifier = ScriptedClassifier::new(vec![
        confident(Intent::CreatePage(CreatePageEntities::default())),
        confident(Intent::CreatePage(CreatePageEntities {
            details: Some("Do you deliver?".into()),
            ..CreatePageEntities::default()
        })),
    ]);
    let h = HarnessBuilder::new(classifier).build().await;
    offer_faq(&h.store).await;

    h.engine.process_message(USER, "sure, go ahead").await;
    h.engine
        .process_message(USER, "people ask if we deliver")
        .await;

    let pages = h.site.pages(USER).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].schema_type, SchemaType::FaqPage);
    assert!(pages[0].content.contains("Do you deliver?"));
}

#[tokio::test]
async fn unclassified_yes_still_accepts_the_open_suggestion() {
    // Every turn falls back to UNKNOWN.
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier).build().await;
    offer_faq(&h.store).await;

    let question = h.engine.process_message(USER, "yes let's do it").await;
    assert!(question.contains(FAQ_DETAILS_MARK), "got: {question}");
    assert!(h.site.pages(USER).await.is_empty());

    h.engine
        .process_message(USER, "Do you deliver? Are your cakes gluten free?")
        .await;

    let pages = h.site.pages(USER).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].schema_type, SchemaType::FaqPage);
}

#[tokio::test]
async fn unclassified_yes_without_suggestions_asks_for_clarification() {
    let classifier = ScriptedClassifier::new(vec![]);
    let h = HarnessBuilder::new(classifier).build().await;

    let reply = h.engine.process_message(USER, "yes let's do it").await;

    assert_eq!(reply, FALLBACK_CLARIFICATION);
    assert!(h.site.pages(USER).await.is_empty());
}

// ── Profile ─────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_update_reports_changed_fields() {
    let classifier = ScriptedClassifier::new(vec![confident(Intent::UpdateProfile(
        ProfileUpdate {
            business_hours: Some("Tue-Sun 7am-3pm".into()),
            industry: Some("Bakery".into()),
            ..ProfileUpdate::default()
        },
    ))]);
    let h = HarnessBuilder::new(classifier).build().await;

    let reply = h
        .engine
        .process_message(USER, "we're a bakery open Tue-Sun 7am-3pm")
        .await;

    assert!(reply.contains("industry"));
    assert!(reply.contains("business hours"));
    let profile = h.store.get_profile(USER).await.unwrap().unwrap();
    assert_eq!(profile.business_hours.as_deref(), Some("Tue-Sun 7am-3pm"));
}
