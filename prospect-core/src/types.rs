use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sentinel stored when the upstream author account is missing or deleted.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Stamped into the SQLite `user_version` pragma. Bump on any column
/// change so older builds refuse newer stores instead of corrupting them.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: DateTime<Utc>,
    pub author: String,
    pub subreddit: String,
    pub url: String,
    pub search_pattern: String,
    pub upvote_ratio: f64,
    pub is_self: bool,
    pub domain: String,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub comment_id: String,
    /// May reference a post that is not persisted yet; the FK is not
    /// enforced at write time.
    pub post_id: String,
    pub body: String,
    pub score: i64,
    pub created_utc: DateTime<Utc>,
    pub author: String,
}

/// Recency window for the upstream search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl TimeFilter {
    /// Token the Reddit search API expects in the `t` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeFilter::Hour),
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "year" => Ok(TimeFilter::Year),
            "all" => Ok(TimeFilter::All),
            other => Err(ConfigError::InvalidValue {
                field: "time_filter".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
