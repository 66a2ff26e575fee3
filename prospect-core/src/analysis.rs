use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Post;

pub const HIGH_QUALITY_MIN_SCORE: i64 = 10;
pub const HIGH_QUALITY_MIN_COMMENTS: i64 = 5;

/// Aggregates for one search pattern across a batch of posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub pattern: String,
    pub post_count: usize,
    pub total_score: i64,
    pub mean_score: f64,
    pub total_comments: i64,
    pub mean_comments: f64,
    pub mean_upvote_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternReport {
    /// One entry per pattern, ordered by pattern text.
    pub patterns: Vec<PatternStats>,
    /// Posts with score >= 10 and at least 5 comments.
    pub high_quality_posts: usize,
}

pub fn is_high_quality(post: &Post) -> bool {
    post.score >= HIGH_QUALITY_MIN_SCORE && post.num_comments >= HIGH_QUALITY_MIN_COMMENTS
}

#[derive(Default)]
struct PatternAccumulator {
    post_count: usize,
    total_score: i64,
    total_comments: i64,
    upvote_ratio_sum: f64,
}

/// Pure aggregation over an in-memory batch; no storage involved.
pub fn analyze_patterns(posts: &[Post]) -> PatternReport {
    let mut by_pattern: BTreeMap<&str, PatternAccumulator> = BTreeMap::new();
    let mut high_quality_posts = 0;

    for post in posts {
        let acc = by_pattern.entry(post.search_pattern.as_str()).or_default();
        acc.post_count += 1;
        acc.total_score += post.score;
        acc.total_comments += post.num_comments;
        acc.upvote_ratio_sum += post.upvote_ratio;

        if is_high_quality(post) {
            high_quality_posts += 1;
        }
    }

    let patterns = by_pattern
        .into_iter()
        .map(|(pattern, acc)| {
            let count = acc.post_count as f64;
            PatternStats {
                pattern: pattern.to_string(),
                post_count: acc.post_count,
                total_score: acc.total_score,
                mean_score: round2(acc.total_score as f64 / count),
                total_comments: acc.total_comments,
                mean_comments: round2(acc.total_comments as f64 / count),
                mean_upvote_ratio: round2(acc.upvote_ratio_sum / count),
            }
        })
        .collect();

    PatternReport {
        patterns,
        high_quality_posts,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
