//! Remote object store
//!
//! The cloud mirror is consumed as a flat name-addressed store: folders and
//! files are looked up by `(name, parent)` and the first match wins, since the
//! backing store does not enforce unique names.

pub mod auth;
pub mod drive;

use thiserror::Error;

pub use auth::{AccessToken, AuthorizedUserToken};
pub use drive::{DriveConfig, DriveStore};

use crate::models::UploadAction;

/// Remote store errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Name-addressed remote folder/file store
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// First folder named `name` under `parent` (top level when `None`)
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<Option<String>>;

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> RemoteResult<String>;

    /// First non-folder object named `name` directly under `parent`
    async fn find_file(&self, name: &str, parent: &str) -> RemoteResult<Option<String>>;

    async fn create_file(&self, name: &str, parent: &str, content: Vec<u8>) -> RemoteResult<String>;

    /// Replace the content of an existing object, keeping its id
    async fn update_file(&self, id: &str, content: Vec<u8>) -> RemoteResult<()>;
}

/// Look a folder up by name, creating it when absent
pub async fn ensure_folder<R: RemoteStore + ?Sized>(
    store: &R,
    name: &str,
    parent: Option<&str>,
) -> RemoteResult<String> {
    if let Some(id) = store.find_folder(name, parent).await? {
        tracing::debug!(folder = %name, folder_id = %id, "Remote folder found");
        return Ok(id);
    }

    let id = store.create_folder(name, parent).await?;
    tracing::info!(folder = %name, folder_id = %id, "Remote folder created");
    Ok(id)
}

/// Update the same-named object under `parent` in place, or create it
pub async fn upsert_file<R: RemoteStore + ?Sized>(
    store: &R,
    name: &str,
    parent: &str,
    content: Vec<u8>,
) -> RemoteResult<UploadAction> {
    match store.find_file(name, parent).await? {
        Some(id) => {
            store.update_file(&id, content).await?;
            tracing::info!(file = %name, remote_id = %id, "Remote file updated");
            Ok(UploadAction::Updated(id))
        }
        None => {
            let id = store.create_file(name, parent, content).await?;
            tracing::info!(file = %name, remote_id = %id, "Remote file created");
            Ok(UploadAction::Created(id))
        }
    }
}
