//! Bounded retry with fixed backoff
//!
//! Portal operations are retried a fixed number of times with a constant pause
//! between attempts. Once the budget is spent the last error is returned.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry budget and pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Attempt numbers, 1-based
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Pause after a failed `attempt` unless it was the last one
    pub async fn backoff_after(&self, operation_name: &str, attempt: u32) {
        if self.is_last(attempt) {
            return;
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            max_attempts = self.max_attempts,
            backoff_ms = self.backoff.as_millis() as u64,
            "Attempt failed, will retry after backoff"
        );
        tokio::time::sleep(self.backoff).await;
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up
///
/// # Returns
/// The first success, or the error of the final attempt
pub async fn retry_fixed<F, Fut, T, E>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if policy.is_last(attempt) {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Operation failed: retry budget exhausted"
                    );
                    return Err(err);
                }

                tracing::debug!(operation = operation_name, attempt, error = %err, "Attempt failed");
                policy.backoff_after(operation_name, attempt).await;
            }
        }
    }
}
