//! App-only OAuth (client_credentials grant). The script exchanges its
//! client id/secret for a bearer token once per run.

use prospect_core::{CoreError, RedditApiError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    /// Reddit reports bad credentials as 200 with an error body.
    #[serde(default)]
    error: Option<String>,
}

pub async fn fetch_app_token(
    http_client: &Client,
    client_id: &str,
    client_secret: &str,
) -> Result<AccessToken, CoreError> {
    debug!("Requesting app-only access token");

    let response = http_client
        .post(TOKEN_URL)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        error!("Token endpoint returned {}", status);
        return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: format!("token endpoint returned {status}"),
        }));
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        error!("Failed to parse token response: {}", e);
        CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: "unparseable token response".to_string(),
        })
    })?;

    if let Some(error) = token.error {
        return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: error,
        }));
    }
    if token.access_token.is_empty() {
        return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: "empty access token".to_string(),
        }));
    }

    debug!("Access token granted, expires in {}s", token.expires_in);
    Ok(AccessToken {
        access_token: token.access_token,
        expires_in: token.expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_tolerates_error_body() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"error": "invalid_grant"}"#).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("invalid_grant"));
        assert!(parsed.access_token.is_empty());
    }

    #[test]
    fn token_response_parses_success_body() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"access_token": "tok-1", "token_type": "bearer", "expires_in": 3600, "scope": "*"}"#,
        )
        .unwrap();
        assert_eq!(parsed.access_token, "tok-1");
        assert_eq!(parsed.expires_in, 3600);
        assert!(parsed.error.is_none());
    }
}
