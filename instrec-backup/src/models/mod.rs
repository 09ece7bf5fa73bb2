//! Data models for instrec-backup
//!
//! - Portal session state machine
//! - Discovered entities (owners, records, files) and mirror entries
//! - Per-file / per-owner outcomes and the run summary

pub mod entities;
pub mod outcome;
pub mod run_summary;
pub mod session_state;

pub use entities::{FileRef, MirrorEntry, OwnerKey, OwnerListing, RecordRef};
pub use outcome::{OwnerOutcome, OwnerTally, ReconcileOutcome, SkipReason, UploadAction};
pub use run_summary::{RunFailure, RunSummary};
pub use session_state::{SessionState, SessionTracker, StateTransition};
