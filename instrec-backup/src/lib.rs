//! instrec-backup library interface
//!
//! Idempotent backup of per-instructor training records: a browser session
//! scrapes the enrollment portal, files are mirrored to a local tree and to a
//! remote store. Exposed as a library so the pipeline can be driven against
//! fake collaborators in tests.

pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod session;
pub mod transfer;
pub mod utils;

pub use crate::error::{BackupError, BackupResult};

/// Build identification captured by build.rs
pub fn build_info() -> (&'static str, &'static str, &'static str) {
    (env!("GIT_HASH"), env!("BUILD_TIMESTAMP"), env!("BUILD_PROFILE"))
}
