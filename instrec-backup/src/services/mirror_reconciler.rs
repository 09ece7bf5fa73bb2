//! Mirror reconciler
//!
//! Local file existence is the only idempotence marker. An owner whose local
//! folder already exists is skipped as a whole (in `owner` mode); otherwise
//! each discovered file is downloaded unless its target path exists, then
//! upserted into the owner's remote folder.
//!
//! The local owner folder doubles as the owner-mode marker, so it is created
//! last: only after the owner's records were read and the remote folder exists.
//!
//! Downloads land in `<name>.part` and are renamed into place only once the
//! body is complete, so an interrupted run never leaves a truncated file that
//! the next run would mistake for a finished one.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{BackupError, BackupResult};
use crate::models::{FileRef, MirrorEntry, OwnerKey, ReconcileOutcome, SkipReason};
use crate::remote::{ensure_folder, upsert_file, RemoteStore};
use crate::services::record_discovery::validate_file_name;
use crate::transfer::HttpFetch;

/// Suffix of in-flight downloads
pub const PART_SUFFIX: &str = ".part";

/// Granularity of the "already mirrored" check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// An existing owner folder skips the whole owner
    #[default]
    Owner,
    /// Every owner is visited; only existing files are skipped
    File,
}

impl std::fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileMode::Owner => f.write_str("owner"),
            ReconcileMode::File => f.write_str("file"),
        }
    }
}

/// An owner ready to receive files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerMirror {
    pub key: OwnerKey,
    pub local_dir: PathBuf,
    pub remote_folder_id: String,
}

/// Reconciles discovered files against the local tree and the remote store
pub struct MirrorReconciler<'a, R: RemoteStore + ?Sized, F: HttpFetch + ?Sized> {
    store: &'a R,
    fetcher: &'a F,
    local_root: PathBuf,
    remote_root_id: String,
    mode: ReconcileMode,
}

impl<'a, R: RemoteStore + ?Sized, F: HttpFetch + ?Sized> MirrorReconciler<'a, R, F> {
    pub fn new(
        store: &'a R,
        fetcher: &'a F,
        local_root: PathBuf,
        remote_root_id: String,
        mode: ReconcileMode,
    ) -> Self {
        Self {
            store,
            fetcher,
            local_root,
            remote_root_id,
            mode,
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    pub fn owner_dir(&self, key: &OwnerKey) -> PathBuf {
        self.local_root.join(key.as_str())
    }

    /// Owner mode only: the local owner folder exists from an earlier run
    pub fn is_already_mirrored(&self, key: &OwnerKey) -> BackupResult<bool> {
        validate_owner_key(key)?;

        let mirrored = self.mode == ReconcileMode::Owner && self.owner_dir(key).is_dir();
        if mirrored {
            tracing::info!(owner = %key, "Owner folder already exists, skipping owner");
        }
        Ok(mirrored)
    }

    /// Create the owner's remote folder, then its local folder
    pub async fn prepare_owner(&self, key: &OwnerKey) -> BackupResult<OwnerMirror> {
        validate_owner_key(key)?;
        let local_dir = self.owner_dir(key);

        let remote_folder_id =
            ensure_folder(self.store, key.as_str(), Some(&self.remote_root_id)).await?;
        tokio::fs::create_dir_all(&local_dir).await?;

        tracing::debug!(
            owner = %key,
            local_dir = %local_dir.display(),
            remote_folder_id = %remote_folder_id,
            "Owner folders ready"
        );

        Ok(OwnerMirror {
            key: key.clone(),
            local_dir,
            remote_folder_id,
        })
    }

    /// Bring one file into both mirrors
    pub async fn reconcile(&self, owner: &OwnerMirror, file: &FileRef) -> ReconcileOutcome {
        if let Err(reason) = validate_file_name(&file.file_name) {
            return ReconcileOutcome::Failed(BackupError::Discovery(reason));
        }

        let target = owner.local_dir.join(&file.file_name);

        match tokio::fs::try_exists(&target).await {
            Ok(true) => {
                tracing::info!(owner = %owner.key, file = %file.file_name, "File already exists locally, skipping");
                return ReconcileOutcome::Skipped(SkipReason::AlreadyLocal);
            }
            Ok(false) => {}
            Err(e) => return ReconcileOutcome::Failed(BackupError::Io(e)),
        }

        let bytes = match self.download(&file.source_url, &target).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    owner = %owner.key,
                    file = %file.file_name,
                    url = %file.source_url,
                    error = %e,
                    "Download failed, skipping file"
                );
                return ReconcileOutcome::Failed(e);
            }
        };
        tracing::info!(owner = %owner.key, file = %file.file_name, bytes, "Downloaded");

        let content = match tokio::fs::read(&target).await {
            Ok(content) => content,
            Err(e) => return ReconcileOutcome::Failed(BackupError::Io(e)),
        };

        match upsert_file(self.store, &file.file_name, &owner.remote_folder_id, content).await {
            Ok(upload) => {
                let entry = MirrorEntry {
                    local_path: target,
                    remote_object_id: upload.remote_id().to_string(),
                };
                ReconcileOutcome::Downloaded { bytes, upload, entry }
            }
            Err(e) => {
                // The local copy stays; the next run treats the file as done
                tracing::error!(
                    owner = %owner.key,
                    file = %file.file_name,
                    error = %e,
                    "Upload failed"
                );
                ReconcileOutcome::Failed(e.into())
            }
        }
    }

    /// Stream `url` into `target` via a `.part` sibling
    async fn download(&self, url: &str, target: &Path) -> BackupResult<u64> {
        let response = self.fetcher.fetch(url).await?;
        if !response.is_success() {
            return Err(BackupError::Transfer(format!(
                "HTTP {} fetching {}",
                response.status, url
            )));
        }

        let part = part_path(target);
        let written = write_stream(response.body, &part).await;

        let result = match written {
            Ok(bytes) => tokio::fs::rename(&part, target)
                .await
                .map(|_| bytes)
                .map_err(BackupError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %part.display(), error = %e, "Could not remove partial download");
                }
            }
        }

        result
    }
}

async fn write_stream(
    mut body: futures::stream::BoxStream<'static, Result<Vec<u8>, crate::transfer::FetchError>>,
    path: &Path,
) -> BackupResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// An owner key must name exactly one folder directly under the mirror root
fn validate_owner_key(key: &OwnerKey) -> BackupResult<()> {
    let mut components = Path::new(key.as_str()).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name.to_str() == Some(key.as_str()) => Ok(()),
        _ => Err(BackupError::Discovery(format!(
            "owner key {:?} is not a single folder name",
            key.as_str()
        ))),
    }
}

/// `<target>.part`
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}
