//! Session gatekeeper against the fake portal

mod helpers;

use helpers::*;
use instrec_backup::models::SessionState;
use instrec_backup::services::{GatekeeperConfig, LoginSelectors, SessionGatekeeper};
use instrec_backup::session::NavigableSession;
use instrec_backup::BackupError;

fn gatekeeper(config: GatekeeperConfig) -> SessionGatekeeper {
    SessionGatekeeper::new(config, Some(test_credentials()))
}

#[tokio::test]
async fn test_login_then_listing_with_all_rows() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());

    gatekeeper.establish_session(&mut portal).await.unwrap();

    assert_eq!(gatekeeper.state(), SessionState::NavigatedToListing);
    assert_eq!(
        portal.inputs(),
        vec![
            ("username".to_string(), "trainer@example.com".to_string()),
            ("password".to_string(), "correct horse".to_string()),
        ]
    );
    assert_eq!(portal.clicks(), vec!["rememberMe".to_string(), "loginButton".to_string()]);

    let show_all = LoginSelectors::default().show_all;
    assert_eq!(
        portal.selections(),
        vec![(show_all.value().to_string(), "All".to_string())]
    );
    assert_eq!(portal.current_url().await.unwrap(), LISTING_URL);
}

#[tokio::test]
async fn test_transitions_are_recorded_in_order() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());

    gatekeeper.establish_session(&mut portal).await.unwrap();

    let states: Vec<SessionState> = gatekeeper
        .tracker()
        .history()
        .iter()
        .map(|t| t.new_state)
        .collect();
    assert_eq!(
        states,
        vec![
            SessionState::LoggingIn,
            SessionState::LoggedIn,
            SessionState::NavigatedToListing,
        ]
    );
}

#[tokio::test]
async fn test_missing_credentials_fail_before_navigation() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    let mut gatekeeper = SessionGatekeeper::new(fast_gatekeeper_config(), None);

    let err = gatekeeper.establish_session(&mut portal).await.unwrap_err();

    assert!(matches!(err, BackupError::Configuration(_)));
    assert!(err.is_fatal());
    assert_eq!(gatekeeper.state(), SessionState::Failed);
    assert!(portal.navigations().is_empty());
}

#[tokio::test]
async fn test_blank_credentials_count_as_missing() {
    let mut portal = FakePortal::new().with_login_form();
    let mut gatekeeper = SessionGatekeeper::new(
        fast_gatekeeper_config(),
        Some(instrec_backup::config::Credentials::new("", "")),
    );

    let err = gatekeeper.establish_session(&mut portal).await.unwrap_err();
    assert!(matches!(err, BackupError::Configuration(_)));
    assert!(portal.navigations().is_empty());
}

#[tokio::test]
async fn test_login_retries_are_bounded() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    // Submitting keeps the browser on the sign-in page
    portal.redirect_on_click(&LoginSelectors::default().submit, LOGIN_URL);

    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());
    let err = gatekeeper.establish_session(&mut portal).await.unwrap_err();

    assert!(matches!(err, BackupError::Session(_)));
    assert!(err.is_fatal());
    assert_eq!(gatekeeper.state(), SessionState::Failed);
    assert_eq!(portal.navigation_count(LOGIN_URL), 3);
    assert_eq!(portal.navigation_count(LISTING_URL), 0);
}

#[tokio::test]
async fn test_custom_retry_budget() {
    let mut portal = FakePortal::new().with_login_form();
    portal.redirect_on_click(&LoginSelectors::default().submit, LOGIN_URL);

    let config = GatekeeperConfig {
        max_retries: 5,
        ..fast_gatekeeper_config()
    };
    let mut gatekeeper = gatekeeper(config);
    gatekeeper.establish_session(&mut portal).await.unwrap_err();

    assert_eq!(portal.navigation_count(LOGIN_URL), 5);
}

#[tokio::test]
async fn test_login_recovers_from_transient_navigation_failures() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    portal.fail_navigation(LOGIN_URL, 2);

    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());
    gatekeeper.establish_session(&mut portal).await.unwrap();

    assert_eq!(gatekeeper.state(), SessionState::NavigatedToListing);
    assert_eq!(portal.navigation_count(LOGIN_URL), 3);
}

#[tokio::test]
async fn test_absent_login_form_means_already_authenticated() {
    let mut portal = FakePortal::new().with_owners(&[]);
    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());

    gatekeeper.establish_session(&mut portal).await.unwrap();

    assert_eq!(gatekeeper.state(), SessionState::NavigatedToListing);
    assert!(portal.inputs().is_empty());
    assert!(portal.clicks().is_empty());
}

#[tokio::test]
async fn test_listing_navigation_retries_are_bounded() {
    let mut portal = FakePortal::new().with_login_form().with_owners(&[]);
    portal.fail_navigation(LISTING_URL, usize::MAX);

    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());
    let err = gatekeeper.establish_session(&mut portal).await.unwrap_err();

    assert!(matches!(err, BackupError::Session(_)));
    assert_eq!(gatekeeper.state(), SessionState::Failed);
    assert_eq!(portal.navigation_count(LOGIN_URL), 1);
    assert_eq!(portal.navigation_count(LISTING_URL), 3);
}

#[tokio::test]
async fn test_missing_show_all_control_is_not_fatal() {
    let mut portal = FakePortal::new().with_login_form();
    portal.add_page(LISTING_URL, FakePage::new());

    let mut gatekeeper = gatekeeper(fast_gatekeeper_config());
    gatekeeper.establish_session(&mut portal).await.unwrap();

    assert_eq!(gatekeeper.state(), SessionState::NavigatedToListing);
    assert!(portal.selections().is_empty());
}
