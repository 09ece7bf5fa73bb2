//! # instrec Common Library
//!
//! Shared code for the instructor-records backup tools:
//! - Error and result types
//! - TOML configuration model and file helpers
//! - Root folder resolution (CLI → ENV → TOML → compiled default)

pub mod config;
pub mod error;

pub use error::{Error, Result};
