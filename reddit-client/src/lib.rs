pub mod api;
pub mod auth;
pub mod extractor;
pub mod matcher;
pub mod rate_limiter;
pub mod retry;
pub mod scraper;


pub use api::{RedditApi, RedditApiClient};
pub use matcher::SEARCH_PATTERNS;
pub use scraper::{RedditScraper, DEFAULT_SUBREDDITS};
