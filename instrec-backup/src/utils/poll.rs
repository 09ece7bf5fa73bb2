//! Poll-until-condition with a timeout
//!
//! Stands in for "wait for the page to finish rendering": the condition is
//! checked immediately, then every `interval` until it holds or `timeout`
//! elapses. The condition is always evaluated at least once.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default interval between condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Returns true as soon as `condition` holds, false on timeout
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if condition().await {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Like [`wait_until`] but yields the first `Some` value produced
pub async fn poll_for<F, Fut, T>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_condition_true_immediately() {
        let checks = Cell::new(0);
        let ok = wait_until(Duration::from_secs(5), Duration::from_millis(10), || {
            checks.set(checks.get() + 1);
            async { true }
        })
        .await;

        assert!(ok);
        assert_eq!(checks.get(), 1);
    }

    #[tokio::test]
    async fn test_condition_becomes_true() {
        let checks = Cell::new(0);
        let ok = wait_until(Duration::from_secs(5), Duration::from_millis(1), || {
            checks.set(checks.get() + 1);
            let n = checks.get();
            async move { n >= 3 }
        })
        .await;

        assert!(ok);
        assert_eq!(checks.get(), 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_false() {
        let ok = wait_until(Duration::from_millis(20), Duration::from_millis(5), || async {
            false
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_zero_timeout_checks_once() {
        let checks = Cell::new(0);
        let ok = wait_until(Duration::ZERO, Duration::from_millis(5), || {
            checks.set(checks.get() + 1);
            async { false }
        })
        .await;

        assert!(!ok);
        assert_eq!(checks.get(), 1);
    }

    #[tokio::test]
    async fn test_poll_for_returns_value() {
        let checks = Cell::new(0);
        let value = poll_for(Duration::from_secs(1), Duration::from_millis(1), || {
            checks.set(checks.get() + 1);
            let n = checks.get();
            async move { (n == 2).then_some("ready") }
        })
        .await;

        assert_eq!(value, Some("ready"));
    }
}
