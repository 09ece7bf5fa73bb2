//! Entities discovered on the portal and their mirror locations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::name_canonicalizer::{canonicalize, UNKNOWN_OWNER};

/// Canonical owner (instructor) key; doubles as local dir and remote folder name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey(String);

impl OwnerKey {
    /// Build the key for one listing row
    ///
    /// Names that canonicalize to the sentinel fall back to the row's identifying
    /// text (usually the account email), then to the row number, so unnamed owners
    /// never share a folder. Path separators and NUL in that text become `_`.
    pub fn resolve(raw_name: &str, identifying_text: Option<&str>, row: usize) -> Self {
        let canonical = canonicalize(raw_name);
        if canonical != UNKNOWN_OWNER {
            return Self(canonical);
        }

        match identifying_text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Self(format!("No username ({})", sanitize_folder_text(text))),
            None => Self(format!("No username (row {})", row)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn sanitize_folder_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One row of the instructor listing, before canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerListing {
    /// First line of the name cell
    pub raw_name: String,
    /// Second line of the name cell (account email), if any
    pub identifying_text: Option<String>,
    /// Instructor record page listing this owner's records
    pub record_list_url: String,
}

/// Pointer to one record detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub owner_key: OwnerKey,
    pub source_url: String,
}

/// Downloadable file attached to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub owner_key: OwnerKey,
    /// Verbatim portal file name
    pub file_name: String,
    pub source_url: String,
}

/// Materialized local/remote pair for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    pub local_path: PathBuf,
    pub remote_object_id: String,
}
