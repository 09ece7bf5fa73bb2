//! Utility modules for instrec-backup

pub mod poll;
pub mod retry;

pub use poll::{poll_for, wait_until, DEFAULT_POLL_INTERVAL};
pub use retry::{retry_fixed, RetryPolicy};
