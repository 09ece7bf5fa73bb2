//! Test helpers for instrec-backup
//!
//! Fake collaborators for the pipeline: a scriptable portal session, an
//! in-memory remote store and a scripted HTTP fetcher.

#![allow(dead_code)]

pub mod fake_portal;
pub mod memory_store;
pub mod scripted_fetch;

use std::time::Duration;

use instrec_backup::config::Credentials;
use instrec_backup::services::GatekeeperConfig;

pub use fake_portal::{FakeElement, FakePage, FakePortal, OwnerFixture, HOME_URL, LISTING_URL, LOGIN_URL};
pub use memory_store::{MemoryStore, RemoteObject};
pub use scripted_fetch::ScriptedFetcher;

/// Gatekeeper pointed at the fake portal with millisecond timings
pub fn fast_gatekeeper_config() -> GatekeeperConfig {
    GatekeeperConfig {
        login_url: LOGIN_URL.to_string(),
        listing_url: LISTING_URL.to_string(),
        login_backoff: Duration::from_millis(1),
        navigation_backoff: Duration::from_millis(1),
        form_timeout: Duration::from_millis(5),
        redirect_timeout: Duration::from_millis(20),
        poll_interval: Duration::from_millis(1),
        ..GatekeeperConfig::default()
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new("trainer@example.com", "correct horse")
}
