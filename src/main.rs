use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use growth_assist::agent::{Engine, EngineDeps, LlmIntentClassifier};
use growth_assist::config::EngineConfig;
use growth_assist::llm::{LlmConfig, create_provider};
use growth_assist::onboarding::LlmProfileScraper;
use growth_assist::services::{MemorySite, PageType, Services};
use growth_assist::store::{LibSqlBackend, SuggestionStore};
use growth_assist::suggestions::{Suggestion, SuggestionCategory, SuggestionPriority};
use growth_assist::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the appender guard alive for the whole run so buffered lines flush.
    let _log_guard = init_tracing();
    telemetry::register_metrics();

    let config = EngineConfig::from_env()?;
    let llm_config = LlmConfig::from_env().context("ANTHROPIC_API_KEY must be set")?;
    let llm = create_provider(&llm_config)?;

    let db_path = std::env::var("GROWTH_ASSIST_DB_PATH")
        .unwrap_or_else(|_| "./data/growth-assist.db".to_string());
    let store = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&db_path))
            .await
            .with_context(|| format!("failed to open database at {db_path}"))?,
    );
    let user_id =
        std::env::var("GROWTH_ASSIST_USER").unwrap_or_else(|_| "local-user".to_string());

    let site = Arc::new(MemorySite::new());
    let engine = Engine::new(
        config.clone(),
        EngineDeps {
            history: store.clone(),
            profiles: store.clone(),
            suggestions: store.clone(),
            classifier: Arc::new(LlmIntentClassifier::new(
                llm.clone(),
                config.classifier_history,
            )),
            scraper: Arc::new(LlmProfileScraper::new(llm.clone())),
            services: Services::from_memory(site.clone()),
        },
    );

    eprintln!("Growth Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_config.model);
    eprintln!("   Database: {db_path}");
    eprintln!("   User: {user_id}");
    eprintln!("   Commands: /pages, /suggest [faq|blog|testimonial] <text>, /quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "/quit" | "/exit" => break,
            "/pages" => {
                for page in site.pages(&user_id).await {
                    println!("  /{} {} ({} embeds)", page.slug, page.title, page.embeds.len());
                }
                continue;
            }
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("/suggest ") {
            let suggestion = parse_suggestion(rest);
            let added = store
                .add_suggestion(&user_id, &suggestion, config.suggestion_dedup_window)
                .await?;
            println!(
                "{}",
                if added {
                    "  suggestion recorded"
                } else {
                    "  duplicate suggestion skipped"
                }
            );
            continue;
        }

        let reply = engine.process_message(&user_id, line).await;
        println!("\n{reply}\n");
    }

    let dropped = engine.failed_history_writes();
    if dropped > 0 {
        eprintln!("warning: {dropped} conversation turns could not be saved");
    }
    Ok(())
}

/// stderr logging, plus a daily-rolling file when `GROWTH_ASSIST_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match std::env::var("GROWTH_ASSIST_LOG_DIR").ok().map(PathBuf::from) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "growth-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

/// `/suggest faq Add an FAQ about gluten-free options`
fn parse_suggestion(input: &str) -> Suggestion {
    let (first, rest) = input.split_once(' ').unwrap_or((input, ""));
    match PageType::parse(first) {
        Some(page_type) if !rest.trim().is_empty() => Suggestion::new(
            rest.trim(),
            SuggestionCategory::SeoOpportunity,
            SuggestionPriority::High,
        )
        .with_page_type(page_type),
        _ => Suggestion::new(
            input.trim(),
            SuggestionCategory::GoalFraming,
            SuggestionPriority::Medium,
        ),
    }
}
