//! Error types for instrec-backup
//!
//! The variants mirror the recovery granularity of a backup run:
//! configuration, revoked remote access and exhausted session failures stop
//! the run, everything else is caught at the file, record or owner level and
//! logged.

use thiserror::Error;

use crate::remote::RemoteError;
use crate::session::DriverError;
use crate::transfer::FetchError;

/// Backup pipeline error
#[derive(Debug, Error)]
pub enum BackupError {
    /// Missing credentials or unusable configuration (fatal, before login)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login or listing navigation failed after the retry budget (fatal)
    #[error("Session error: {0}")]
    Session(String),

    /// A record or file lookup failed; the unit is skipped
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Download or upload failed; the file is skipped
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Unexpected failure while processing one owner; the run continues
    #[error("Owner processing error: {0}")]
    OwnerLevel(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// instrec-common error
    #[error("Common error: {0}")]
    Common(#[from] instrec_common::Error),
}

impl BackupError {
    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackupError::Configuration(_)
                | BackupError::Session(_)
                | BackupError::Common(instrec_common::Error::Config(_))
        )
    }
}

impl From<DriverError> for BackupError {
    fn from(err: DriverError) -> Self {
        BackupError::Discovery(err.to_string())
    }
}

impl From<RemoteError> for BackupError {
    fn from(err: RemoteError) -> Self {
        match err {
            // No later upload can succeed without fresh credentials
            RemoteError::Auth(_) => BackupError::Configuration(err.to_string()),
            _ => BackupError::Transfer(err.to_string()),
        }
    }
}

impl From<FetchError> for BackupError {
    fn from(err: FetchError) -> Self {
        BackupError::Transfer(err.to_string())
    }
}

/// Result type for backup operations
pub type BackupResult<T> = Result<T, BackupError>;
