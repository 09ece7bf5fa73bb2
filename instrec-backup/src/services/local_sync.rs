//! Local mirror sync
//!
//! Pushes an existing local mirror tree to the remote store: every directory
//! is looked up or created under its parent's remote folder, every regular
//! file is upserted by name. Used to rebuild the remote mirror from local state
//! without touching the portal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{BackupError, BackupResult};
use crate::models::UploadAction;
use crate::remote::{ensure_folder, upsert_file, RemoteStore};
use crate::services::mirror_reconciler::PART_SUFFIX;

/// Counters for one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub folders: usize,
    pub files_created: usize,
    pub files_updated: usize,
    /// Partial downloads left behind by an interrupted run
    pub partial_files_ignored: usize,
    pub failures: usize,
}

impl SyncSummary {
    pub fn is_complete(&self) -> bool {
        self.failures == 0
    }
}

/// Mirror `local_root` into the remote folder `remote_root_id`
///
/// Entries are visited in file-name order. A directory whose remote folder
/// cannot be resolved is skipped with its whole subtree.
pub async fn sync_local_mirror<R: RemoteStore + ?Sized>(
    store: &R,
    local_root: &Path,
    remote_root_id: &str,
) -> BackupResult<SyncSummary> {
    if !local_root.is_dir() {
        return Err(BackupError::Configuration(format!(
            "local mirror {} is not a directory",
            local_root.display()
        )));
    }

    let mut summary = SyncSummary::default();
    let mut folder_ids: HashMap<PathBuf, String> = HashMap::new();
    folder_ids.insert(local_root.to_path_buf(), remote_root_id.to_string());

    let mut walker = WalkDir::new(local_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                summary.failures += 1;
                tracing::warn!(error = %e, "Could not read local mirror entry");
                continue;
            }
        };

        let parent_id = match entry.path().parent().and_then(|p| folder_ids.get(p)) {
            Some(id) => id.clone(),
            None => continue,
        };
        let name = entry.file_name().to_string_lossy().to_string();

        if entry.file_type().is_dir() {
            match ensure_folder(store, &name, Some(&parent_id)).await {
                Ok(id) => {
                    summary.folders += 1;
                    folder_ids.insert(entry.path().to_path_buf(), id);
                }
                Err(e) => {
                    summary.failures += 1;
                    tracing::error!(folder = %entry.path().display(), error = %e, "Could not resolve remote folder, skipping subtree");
                    walker.skip_current_dir();
                }
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }

        if name.ends_with(PART_SUFFIX) {
            summary.partial_files_ignored += 1;
            tracing::debug!(path = %entry.path().display(), "Ignoring partial download");
            continue;
        }

        let content = match tokio::fs::read(entry.path()).await {
            Ok(content) => content,
            Err(e) => {
                summary.failures += 1;
                tracing::error!(path = %entry.path().display(), error = %e, "Could not read local file");
                continue;
            }
        };

        match upsert_file(store, &name, &parent_id, content).await {
            Ok(UploadAction::Created(_)) => summary.files_created += 1,
            Ok(UploadAction::Updated(_)) => summary.files_updated += 1,
            Err(e) => {
                summary.failures += 1;
                tracing::error!(path = %entry.path().display(), error = %e, "Upload failed");
            }
        }
    }

    tracing::info!(
        folders = summary.folders,
        created = summary.files_created,
        updated = summary.files_updated,
        failures = summary.failures,
        "Local mirror sync finished"
    );

    Ok(summary)
}
