//! Backup run summary
//!
//! Aggregated counters for a whole run plus the failures that were recovered
//! from, so the final report can tell "all processed" from partial completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::outcome::OwnerOutcome;

/// A failure that was caught and skipped past
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    /// Owner key being processed when the failure happened
    pub owner: String,
    /// Error message
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Backup run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,

    pub owners_discovered: usize,
    pub owners_mirrored: usize,
    pub owners_already_mirrored: usize,
    pub owners_without_records: usize,
    pub owners_failed: usize,

    pub records_seen: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub records_without_file: usize,
    pub discovery_failures: usize,
    pub transfer_failures: usize,
    pub remote_created: usize,
    pub remote_updated: usize,

    pub failures: Vec<RunFailure>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            owners_discovered: 0,
            owners_mirrored: 0,
            owners_already_mirrored: 0,
            owners_without_records: 0,
            owners_failed: 0,
            records_seen: 0,
            files_downloaded: 0,
            files_skipped: 0,
            records_without_file: 0,
            discovery_failures: 0,
            transfer_failures: 0,
            remote_created: 0,
            remote_updated: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_owner(&mut self, outcome: &OwnerOutcome) {
        match outcome {
            OwnerOutcome::AlreadyMirrored => self.owners_already_mirrored += 1,
            OwnerOutcome::NoRecords => self.owners_without_records += 1,
            OwnerOutcome::Processed(tally) => {
                self.owners_mirrored += 1;
                self.records_seen += tally.records;
                self.files_downloaded += tally.files_downloaded;
                self.files_skipped += tally.files_skipped;
                self.records_without_file += tally.records_without_file;
                self.discovery_failures += tally.discovery_failures;
                self.transfer_failures += tally.transfer_failures;
                self.remote_created += tally.remote_created;
                self.remote_updated += tally.remote_updated;
            }
        }
    }

    pub fn record_owner_failure(&mut self, owner: &str, message: String) {
        self.owners_failed += 1;
        self.failures.push(RunFailure {
            owner: owner.to_string(),
            message,
            occurred_at: Utc::now(),
        });
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// True when nothing was skipped because of an error
    pub fn is_complete(&self) -> bool {
        self.owners_failed == 0 && self.discovery_failures == 0 && self.transfer_failures == 0
    }

    /// Final user-facing line
    pub fn final_line(&self) -> String {
        if self.is_complete() {
            "All files processed and backed up locally and to remote storage.".to_string()
        } else {
            format!(
                "Backup finished with failures: {} owner(s) failed, {} record lookup(s) failed, {} transfer(s) failed.",
                self.owners_failed, self.discovery_failures, self.transfer_failures
            )
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
