//! Authorized-user token file
//!
//! Reads the JSON written by an earlier OAuth consent (`client_id`,
//! `client_secret`, `refresh_token`, optionally a cached `token`) and trades
//! the refresh token for a fresh access token.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{RemoteError, RemoteResult};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Contents of an authorized-user token file
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserToken {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Cached access token
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// Bearer token used for API calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

impl AuthorizedUserToken {
    pub fn from_file(path: &Path) -> RemoteResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::Auth(format!("cannot read token file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Auth(format!("invalid token file {}: {}", path.display(), e)))
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Obtain an access token, refreshing when a refresh token is available
    ///
    /// Falls back to the cached token when no refresh credentials are present.
    pub async fn access_token(&self, http: &reqwest::Client) -> RemoteResult<AccessToken> {
        if !self.can_refresh() {
            return self
                .token
                .clone()
                .map(AccessToken)
                .ok_or_else(|| RemoteError::Auth("token file has neither a token nor refresh credentials".into()));
        }

        let token_uri = self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_deref().unwrap_or_default()),
            ("client_secret", self.client_secret.as_deref().unwrap_or_default()),
            ("refresh_token", self.refresh_token.as_deref().unwrap_or_default()),
        ];

        tracing::debug!(token_uri = %token_uri, "Refreshing access token");

        let response = http
            .post(token_uri)
            .form(&params)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!(
                "token refresh failed with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        tracing::info!("Access token refreshed");
        Ok(AccessToken(refreshed.access_token))
    }
}
