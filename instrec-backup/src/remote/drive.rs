//! Google Drive v3 remote store
//!
//! Implements [`RemoteStore`] against the Drive REST API: `files.list` with
//! `q` queries for lookups, JSON metadata POST for folders, `multipart/related`
//! uploads for new files and media `PATCH` for in-place updates.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

use super::auth::{AccessToken, AuthorizedUserToken};
use super::{RemoteError, RemoteResult, RemoteStore};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const USER_AGENT: &str = concat!("instrec-backup/", env!("CARGO_PKG_VERSION"));

/// Drive endpoint and credential settings
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Authorized-user token file (`token.json`)
    pub token_file: PathBuf,
    pub api_base: String,
    pub upload_base: String,
    pub request_timeout: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from("token.json"),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Drive-backed remote store
pub struct DriveStore {
    http: reqwest::Client,
    token: AccessToken,
    api_base: String,
    upload_base: String,
}

impl DriveStore {
    /// Load the token file and obtain an access token
    pub async fn connect(config: &DriveConfig) -> RemoteResult<Self> {
        let http = build_client(config.request_timeout)?;
        let credentials = AuthorizedUserToken::from_file(&config.token_file)?;
        let token = credentials.access_token(&http).await?;

        tracing::info!(api_base = %config.api_base, "Drive store ready");
        Ok(Self::from_parts(http, token, config))
    }

    /// Build a store around an already-issued access token
    pub fn with_token(config: &DriveConfig, token: AccessToken) -> RemoteResult<Self> {
        let http = build_client(config.request_timeout)?;
        Ok(Self::from_parts(http, token, config))
    }

    fn from_parts(http: reqwest::Client, token: AccessToken, config: &DriveConfig) -> Self {
        Self {
            http,
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        }
    }

    async fn list_first(&self, query: String) -> RemoteResult<Option<String>> {
        tracing::debug!(query = %query, "Drive files.list");

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&self.token.0)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("pageSize", "10"),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let list: FileList = parse_json(check_status(response).await?).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }
}

#[async_trait::async_trait]
impl RemoteStore for DriveStore {
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<Option<String>> {
        self.list_first(folder_query(name, parent)).await
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<String> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&self.token.0)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let created: DriveFile = parse_json(check_status(response).await?).await?;
        Ok(created.id)
    }

    async fn find_file(&self, name: &str, parent: &str) -> RemoteResult<Option<String>> {
        self.list_first(file_query(name, parent)).await
    }

    async fn create_file(&self, name: &str, parent: &str, content: Vec<u8>) -> RemoteResult<String> {
        let metadata = json!({ "name": name, "parents": [parent] });
        let boundary = format!("instrec-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, &content);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&self.token.0)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let created: DriveFile = parse_json(check_status(response).await?).await?;
        Ok(created.id)
    }

    async fn update_file(&self, id: &str, content: Vec<u8>) -> RemoteResult<()> {
        let response = self
            .http
            .patch(format!("{}/files/{}", self.upload_base, id))
            .bearer_auth(&self.token.0)
            .query(&[("uploadType", "media"), ("fields", "id")])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

fn build_client(timeout: Duration) -> RemoteResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| RemoteError::Network(e.to_string()))
}

async fn check_status(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Auth(format!("token rejected: {}", body)));
    }
    Err(RemoteError::Api(status.as_u16(), body))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> RemoteResult<T> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::Parse(e.to_string()))
}

/// Escape a value for use inside a single-quoted `q` string
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn folder_query(name: &str, parent: Option<&str>) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false and '{}' in parents",
        escape_query_value(name),
        FOLDER_MIME_TYPE,
        escape_query_value(parent.unwrap_or("root")),
    )
}

fn file_query(name: &str, parent: &str) -> String {
    format!(
        "name = '{}' and mimeType != '{}' and trashed = false and '{}' in parents",
        escape_query_value(name),
        FOLDER_MIME_TYPE,
        escape_query_value(parent),
    )
}

fn multipart_related(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
