//! Pure mapping from raw API items to the normalized record schema. No
//! network or storage side effects.

use chrono::{DateTime, Utc};
use prospect_core::{Comment, Post, DELETED_AUTHOR};

use crate::api::{RedditCommentData, RedditPostData};

/// Host prefixed onto the API's relative permalinks.
const CANONICAL_HOST: &str = "https://reddit.com";

/// Map one search result to a `Post`, tagged with the pattern and subreddit
/// that surfaced it.
pub fn extract_post(raw: &RedditPostData, search_pattern: &str, subreddit: &str) -> Post {
    Post {
        id: raw.id.clone(),
        title: raw.title.clone(),
        content: raw.selftext.clone(),
        score: raw.score,
        num_comments: raw.num_comments,
        created_utc: epoch_to_utc(raw.created_utc),
        author: author_or_sentinel(raw.author.as_deref()),
        subreddit: subreddit.to_string(),
        url: format!("{}{}", CANONICAL_HOST, raw.permalink),
        search_pattern: search_pattern.to_string(),
        upvote_ratio: raw.upvote_ratio.unwrap_or_default(),
        is_self: raw.is_self,
        domain: raw.domain.clone().unwrap_or_default(),
        extracted_at: Utc::now(),
    }
}

/// Map one flattened comment leaf to a `Comment`. Leaves without a body
/// (removed or placeholder nodes) yield `None`.
pub fn extract_comment(raw: &RedditCommentData, post_id: &str) -> Option<Comment> {
    let body = raw.body.clone()?;
    Some(Comment {
        comment_id: raw.id.clone(),
        post_id: post_id.to_string(),
        body,
        score: raw.score,
        created_utc: epoch_to_utc(raw.created_utc),
        author: author_or_sentinel(raw.author.as_deref()),
    })
}

fn author_or_sentinel(author: Option<&str>) -> String {
    match author {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DELETED_AUTHOR.to_string(),
    }
}

/// Source clock is epoch seconds; sub-second precision is not kept.
fn epoch_to_utc(epoch_seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_seconds as i64, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_post() -> RedditPostData {
        RedditPostData {
            id: "abc123".to_string(),
            title: "Is there a tool for tracking invoices?".to_string(),
            selftext: "Spreadsheets are killing me".to_string(),
            author: Some("builder42".to_string()),
            permalink: "/r/smallbusiness/comments/abc123/is_there_a_tool/".to_string(),
            created_utc: 1640995200.0,
            score: 42,
            num_comments: 7,
            upvote_ratio: Some(0.93),
            is_self: true,
            domain: Some("self.smallbusiness".to_string()),
        }
    }

    #[test]
    fn maps_all_fields_with_context() {
        let post = extract_post(&raw_post(), "is there a tool", "smallbusiness");

        assert_eq!(post.id, "abc123");
        assert_eq!(post.subreddit, "smallbusiness");
        assert_eq!(post.search_pattern, "is there a tool");
        assert_eq!(post.author, "builder42");
        assert_eq!(post.score, 42);
        assert_eq!(post.upvote_ratio, 0.93);
        assert_eq!(
            post.url,
            "https://reddit.com/r/smallbusiness/comments/abc123/is_there_a_tool/"
        );
        assert_eq!(post.created_utc.timestamp(), 1640995200);
    }

    #[test]
    fn deleted_author_becomes_sentinel() {
        let mut raw = raw_post();
        raw.author = None;
        let post = extract_post(&raw, "is there a tool", "smallbusiness");
        assert_eq!(post.author, DELETED_AUTHOR);

        raw.author = Some(String::new());
        let post = extract_post(&raw, "is there a tool", "smallbusiness");
        assert_eq!(post.author, DELETED_AUTHOR);
    }

    #[test]
    fn comment_without_body_is_dropped() {
        let raw = RedditCommentData {
            id: "c1".to_string(),
            body: None,
            author: Some("someone".to_string()),
            score: 3,
            created_utc: 1640995200.0,
        };
        assert!(extract_comment(&raw, "abc123").is_none());
    }

    #[test]
    fn comment_maps_owning_post_id() {
        let raw = RedditCommentData {
            id: "c1".to_string(),
            body: Some("try ledgerly".to_string()),
            author: None,
            score: 3,
            created_utc: 1640995200.0,
        };
        let comment = extract_comment(&raw, "abc123").unwrap();

        assert_eq!(comment.post_id, "abc123");
        assert_eq!(comment.author, DELETED_AUTHOR);
        assert_eq!(comment.body, "try ledgerly");
    }
}
