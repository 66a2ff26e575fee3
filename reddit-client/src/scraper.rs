use prospect_core::{Comment, CoreError, Post, RedditApiError, TimeFilter};
use tracing::{debug, error, info};

use crate::api::RedditApi;
use crate::extractor;
use crate::matcher;
use crate::rate_limiter::{Pacer, PacingConfig};

/// SaaS-adjacent communities searched by default.
pub const DEFAULT_SUBREDDITS: [&str; 10] = [
    "entrepreneur",
    "startups",
    "SaaS",
    "productivity",
    "smallbusiness",
    "webdev",
    "digitalnomad",
    "freelance",
    "marketing",
    "analytics",
];

/// Iterates subreddits x patterns against the upstream search, filters and
/// normalizes the results, and paces between external calls. All external
/// calls are strictly sequential.
pub struct RedditScraper<A: RedditApi> {
    api: A,
    search_pacer: Pacer,
    comment_pacer: Pacer,
}

impl<A: RedditApi> RedditScraper<A> {
    pub fn new(api: A) -> Self {
        Self::with_pacing(api, PacingConfig::search(), PacingConfig::comments())
    }

    pub fn with_pacing(api: A, search: PacingConfig, comments: PacingConfig) -> Self {
        Self {
            api,
            search_pacer: Pacer::new(search),
            comment_pacer: Pacer::new(comments),
        }
    }

    /// Search every (subreddit, pattern) pair and return the full list of
    /// relevant records. Duplicates across patterns are kept, each tagged
    /// with the pattern that surfaced it; deduplication happens at
    /// persistence time via primary-key upsert.
    ///
    /// A failed pair is logged and skipped. The run itself fails only when
    /// at least one pair errored and nothing at all was gathered.
    pub async fn search_posts(
        &self,
        subreddits: &[&str],
        patterns: &[&str],
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<Post>, CoreError> {
        let mut all_posts = Vec::new();
        let mut failed_pairs = 0usize;

        for subreddit in subreddits {
            info!("Searching r/{}", subreddit);

            for pattern in patterns {
                debug!("Search pattern: '{}'", pattern);

                match self
                    .api
                    .search_subreddit(subreddit, pattern, limit, time_filter)
                    .await
                {
                    Ok(results) => {
                        let fetched = results.len();
                        let before = all_posts.len();
                        for raw in &results {
                            if matcher::is_relevant(&raw.title, &raw.selftext, pattern) {
                                all_posts.push(extractor::extract_post(raw, pattern, subreddit));
                            }
                        }
                        info!(
                            "r/{} '{}': {} fetched, {} relevant",
                            subreddit,
                            pattern,
                            fetched,
                            all_posts.len() - before
                        );
                    }
                    Err(e) => {
                        failed_pairs += 1;
                        error!("Search '{}' in r/{} failed: {}", pattern, subreddit, e);
                    }
                }

                self.search_pacer.pause().await;
            }
        }

        if all_posts.is_empty() && failed_pairs > 0 {
            return Err(CoreError::RedditApi(RedditApiError::EmptyRun {
                details: format!("{failed_pairs} subreddit/pattern pairs failed"),
            }));
        }

        info!(
            "Search finished: {} relevant posts, {} failed pairs",
            all_posts.len(),
            failed_pairs
        );
        Ok(all_posts)
    }

    /// Fetch flattened comments for a bounded set of posts, capped per post.
    /// One post's failure is logged and skipped; the concatenated list of
    /// everything else is returned.
    pub async fn fetch_comments(&self, post_ids: &[String], max_comments: usize) -> Vec<Comment> {
        let mut all_comments = Vec::new();

        for post_id in post_ids {
            match self.api.comment_tree(post_id).await {
                Ok(flattened) => {
                    let before = all_comments.len();
                    // Cap applies to the flattened forest, before the
                    // bodyless-leaf filter
                    for raw in flattened.iter().take(max_comments) {
                        if let Some(comment) = extractor::extract_comment(raw, post_id) {
                            all_comments.push(comment);
                        }
                    }
                    debug!(
                        "Post {}: kept {} comments",
                        post_id,
                        all_comments.len() - before
                    );
                }
                Err(e) => {
                    error!("Fetching comments for {} failed: {}", post_id, e);
                }
            }

            self.comment_pacer.pause().await;
        }

        info!(
            "Comment fetch finished: {} comments across {} posts",
            all_comments.len(),
            post_ids.len()
        );
        all_comments
    }
}
