use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use database::export::export_batch;
use database::import::import_directory;
use database::Database;
use prospect_core::analysis;
use prospect_core::config::{database_path_in, DEFAULT_DATA_DIR};
use prospect_core::AppConfig;
use reddit_client::{RedditApiClient, RedditScraper, DEFAULT_SUBREDDITS, SEARCH_PATTERNS};

/// Comments are only fetched for the first slice of the batch to keep the
/// API call count bounded.
const COMMENT_POST_LIMIT: usize = 20;
const MAX_COMMENTS_PER_POST: usize = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prospect=info,reddit_client=info,database=info".into()),
        )
        .init();

    match std::env::args().nth(1).as_deref() {
        Some("import") => run_import().await,
        _ => run_ingestion().await,
    }
}

/// Full ingestion run: search, fetch comments, persist, export, report.
async fn run_ingestion() -> anyhow::Result<()> {
    tracing::info!("Starting Prospect - Reddit opportunity scraper");

    let run_started_at = Utc::now();
    let config = AppConfig::from_env().context("loading configuration")?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let api = RedditApiClient::new(&config)?;
    api.authenticate()
        .await
        .context("authenticating with Reddit")?;

    let scraper = RedditScraper::new(api);
    let posts = scraper
        .search_posts(
            &DEFAULT_SUBREDDITS,
            &SEARCH_PATTERNS,
            config.search_limit,
            config.time_filter,
        )
        .await
        .context("searching for posts")?;
    tracing::info!("Gathered {} relevant posts", posts.len());

    let comment_targets: Vec<String> = posts
        .iter()
        .take(COMMENT_POST_LIMIT)
        .map(|post| post.id.clone())
        .collect();
    let comments = scraper
        .fetch_comments(&comment_targets, MAX_COMMENTS_PER_POST)
        .await;

    // Files first: a storage failure must not cost the run its export
    let paths = export_batch(&config.data_dir, run_started_at, &posts, &comments)?;
    tracing::info!("Batch exported to {}", paths.posts_json.display());

    let db = Database::connect(config.database_path()).await?;
    db.run_migrations().await?;
    db.upsert_posts(&posts).await?;
    db.upsert_comments(&comments).await?;

    let report = analysis::analyze_patterns(&posts);
    for stats in &report.patterns {
        tracing::info!(
            "pattern '{}': {} posts, mean score {:.2}, mean comments {:.2}, mean upvote ratio {:.2}",
            stats.pattern,
            stats.post_count,
            stats.mean_score,
            stats.mean_comments,
            stats.mean_upvote_ratio
        );
    }
    tracing::info!("High-quality posts in batch: {}", report.high_quality_posts);

    Ok(())
}

/// Re-ingest previously exported JSON files. Needs no Reddit credentials.
async fn run_import() -> anyhow::Result<()> {
    let data_dir = PathBuf::from(
        std::env::var("PROSPECT_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
    );
    tracing::info!("Importing exported files from {}", data_dir.display());

    let db = Database::connect(database_path_in(&data_dir)).await?;
    let summary = import_directory(&db, &data_dir).await?;

    tracing::info!(
        "Import complete: {} posts, {} comments ({} files skipped)",
        summary.posts,
        summary.comments,
        summary.skipped_files
    );
    Ok(())
}
