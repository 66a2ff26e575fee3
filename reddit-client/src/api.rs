use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use prospect_core::{AppConfig, CoreError, RedditApiError, TimeFilter};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::auth::{self, AccessToken};
use crate::retry::{self, RetryConfig};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Standard Reddit listing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Raw search-result item, pre-normalization. `extractor` turns this into
/// the persisted `Post` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Raw comment leaf after the forest has been flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
}

/// The two upstream capabilities the ingestion pipeline consumes. Behind a
/// trait so the orchestrator can be driven by a mock in tests.
#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Relevance-sorted, window-bounded search restricted to one subreddit.
    async fn search_subreddit(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPostData>, CoreError>;

    /// One post's comment forest, flattened with `more` placeholders dropped.
    async fn comment_tree(&self, post_id: &str) -> Result<Vec<RedditCommentData>, CoreError>;
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<AccessToken>>,
    retry: RetryConfig,
}

impl RedditApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT);

        if let Some(proxy_url) = &config.proxy_url {
            debug!("Routing Reddit API traffic through proxy");
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            http_client: builder.build()?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: RwLock::new(None),
            retry: RetryConfig::reddit(),
        })
    }

    /// Exchange client credentials for a bearer token. Must be called before
    /// any search or comment fetch.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let token =
            auth::fetch_app_token(&self.http_client, &self.client_id, &self.client_secret).await?;
        info!("Authenticated with Reddit (token valid {}s)", token.expires_in);
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn bearer(&self) -> Result<String, CoreError> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
            .ok_or(CoreError::RedditApi(RedditApiError::InvalidToken))
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);
        let access_token = self.bearer().await?;

        retry::with_retry(&self.retry, endpoint, || {
            let method = method.clone();
            let url = url.clone();
            let access_token = access_token.clone();
            async move {
                debug!("Reddit API request: {} {}", method, url);

                let mut request_builder = self
                    .http_client
                    .request(method, &url)
                    .bearer_auth(&access_token);
                if let Some(params) = query_params {
                    request_builder = request_builder.query(params);
                }

                let response = request_builder.send().await.map_err(|e| {
                    error!("Network error for {}: {}", endpoint, e);
                    if e.is_timeout() {
                        CoreError::RedditApi(RedditApiError::RequestTimeout)
                    } else {
                        CoreError::Network(e)
                    }
                })?;

                check_status(response, endpoint)
            }
        })
        .await
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        debug!("Request successful: {} {}", status, endpoint);
        return Ok(response);
    }

    error!("Request failed with status {} for {}", status, endpoint);
    let api_error = match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::NotFound {
            resource: endpoint.to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("unexpected status {code} for {endpoint}"),
        },
    };

    Err(CoreError::RedditApi(api_error))
}

#[async_trait]
impl RedditApi for RedditApiClient {
    async fn search_subreddit(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/search", subreddit);
        let limit_str = limit.to_string();
        let params = [
            ("q", query),
            ("restrict_sr", "1"),
            ("sort", "relevance"),
            ("t", time_filter.as_str()),
            ("limit", limit_str.as_str()),
            ("raw_json", "1"),
        ];

        let response = self
            .make_request(Method::GET, &endpoint, Some(&params))
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse search results: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse search results for r/{subreddit}"),
            })
        })?;

        info!(
            "r/{}: {} search results for '{}'",
            subreddit,
            listing.data.children.len(),
            query
        );
        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    async fn comment_tree(&self, post_id: &str) -> Result<Vec<RedditCommentData>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let params = [("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, Some(&params))
            .await?;

        // The endpoint returns a two-element array: the post listing and
        // the comment forest.
        let payload: Value = response.json().await.map_err(|e| {
            error!("Failed to parse comment tree: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse comment tree for {post_id}"),
            })
        })?;

        let forest = payload
            .get(1)
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("comment response for {post_id} has no comment listing"),
                })
            })?;

        let flattened = flatten_comment_forest(forest);
        debug!("Post {}: {} comments after flattening", post_id, flattened.len());
        Ok(flattened)
    }
}

/// Flatten a comment forest breadth-first (top-level comments first, the
/// upstream's own flattening order). `more` placeholder nodes are dropped
/// rather than resolved; the tree is treated as already-loaded leaves.
pub fn flatten_comment_forest(listing: &Value) -> Vec<RedditCommentData> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    enqueue_children(listing, &mut queue);

    let mut flattened = Vec::new();
    while let Some(node) = queue.pop_front() {
        if node.get("kind").and_then(Value::as_str) != Some("t1") {
            continue;
        }
        let Some(data) = node.get("data") else {
            continue;
        };

        if let Ok(comment) = serde_json::from_value::<RedditCommentData>(data.clone()) {
            flattened.push(comment);
        }
        // Empty reply sets come back as "" instead of a listing object
        if let Some(replies) = data.get("replies") {
            enqueue_children(replies, &mut queue);
        }
    }
    flattened
}

fn enqueue_children<'a>(listing: &'a Value, queue: &mut VecDeque<&'a Value>) {
    if let Some(children) = listing
        .get("data")
        .and_then(|data| data.get("children"))
        .and_then(Value::as_array)
    {
        queue.extend(children.iter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment_node(id: &str, body: &str, replies: Value) -> Value {
        json!({
            "kind": "t1",
            "data": {
                "id": id,
                "body": body,
                "author": "someone",
                "score": 1,
                "created_utc": 1640995200.0,
                "replies": replies
            }
        })
    }

    fn listing(children: Vec<Value>) -> Value {
        json!({ "kind": "Listing", "data": { "children": children } })
    }

    #[test]
    fn flatten_drops_more_placeholders() {
        let forest = listing(vec![
            comment_node("c1", "first", json!("")),
            json!({ "kind": "more", "data": { "count": 57, "children": ["x", "y"] } }),
            comment_node("c2", "second", json!("")),
        ]);

        let flattened = flatten_comment_forest(&forest);
        let ids: Vec<&str> = flattened.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn flatten_walks_replies_breadth_first() {
        let nested = comment_node(
            "c1",
            "top",
            listing(vec![comment_node("c3", "deep", json!(""))]),
        );
        let forest = listing(vec![nested, comment_node("c2", "also top", json!(""))]);

        let flattened = flatten_comment_forest(&forest);
        let ids: Vec<&str> = flattened.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn post_data_tolerates_missing_optional_fields() {
        let raw: RedditPostData = serde_json::from_value(json!({
            "id": "abc",
            "title": "a title",
            "permalink": "/r/test/comments/abc/a_title/"
        }))
        .unwrap();

        assert_eq!(raw.selftext, "");
        assert_eq!(raw.author, None);
        assert_eq!(raw.upvote_ratio, None);
        assert!(!raw.is_self);
    }

    #[test]
    fn client_builds_with_socks_proxy() {
        let config = AppConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "prospect-test/0.1".to_string(),
            proxy_url: Some("socks5://localhost:1080".to_string()),
            data_dir: "reddit_data".into(),
            search_limit: 50,
            time_filter: TimeFilter::Month,
        };
        assert!(RedditApiClient::new(&config).is_ok());
    }
}
