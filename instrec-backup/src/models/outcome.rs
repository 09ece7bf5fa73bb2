//! Per-file and per-owner outcomes
//!
//! Tagged results instead of raised errors: each caller applies its own
//! recovery policy by matching on the variant.

use crate::error::BackupError;

use super::entities::MirrorEntry;

/// Why a file was not transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Target path already exists in the local mirror
    AlreadyLocal,
}

/// What the remote upsert did after a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAction {
    /// No same-named object existed; a new one was created
    Created(String),
    /// An existing object was updated in place
    Updated(String),
}

impl UploadAction {
    pub fn remote_id(&self) -> &str {
        match self {
            UploadAction::Created(id) | UploadAction::Updated(id) => id,
        }
    }
}

/// Result of reconciling one file
#[derive(Debug)]
pub enum ReconcileOutcome {
    Downloaded {
        bytes: u64,
        upload: UploadAction,
        entry: MirrorEntry,
    },
    Skipped(SkipReason),
    Failed(BackupError),
}

/// Counters for one processed owner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTally {
    pub records: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub records_without_file: usize,
    pub discovery_failures: usize,
    pub transfer_failures: usize,
    pub remote_created: usize,
    pub remote_updated: usize,
}

impl OwnerTally {
    pub fn record_file(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Downloaded { upload, .. } => {
                self.files_downloaded += 1;
                match upload {
                    UploadAction::Created(_) => self.remote_created += 1,
                    UploadAction::Updated(_) => self.remote_updated += 1,
                }
            }
            ReconcileOutcome::Skipped(_) => self.files_skipped += 1,
            ReconcileOutcome::Failed(_) => self.transfer_failures += 1,
        }
    }
}

/// Result of processing one owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerOutcome {
    /// Local owner folder existed before this owner was reached
    AlreadyMirrored,
    /// The portal reports no records for this owner
    NoRecords,
    /// Records were walked; see the tally for per-file results
    Processed(OwnerTally),
}
