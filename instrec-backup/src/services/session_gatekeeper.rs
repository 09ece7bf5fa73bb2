//! Session gatekeeper
//!
//! Drives the shared browser session from LOGGED_OUT to NAVIGATED_TO_LISTING:
//! log in (bounded retries, fixed backoff), wait for the redirect into the
//! authenticated area, open the instructor listing and show all rows.
//! Exhausting either retry budget leaves the tracker in FAILED and returns a
//! fatal [`BackupError::Session`].

use std::time::Duration;

use crate::config::Credentials;
use crate::error::{BackupError, BackupResult};
use crate::models::{SessionState, SessionTracker};
use crate::session::{DriverResult, NavigableSession, Selector};
use crate::utils::{retry_fixed, wait_until, RetryPolicy, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_LOGIN_URL: &str = "https://enrollware.com/admin";
pub const DEFAULT_LISTING_URL: &str = "https://www.enrollware.com/admin/instructor-list.aspx";
pub const DEFAULT_AUTHENTICATED_MARKER: &str = "admin";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Login form and listing controls
#[derive(Debug, Clone)]
pub struct LoginSelectors {
    pub username: Selector,
    pub password: Selector,
    pub remember: Selector,
    pub submit: Selector,
    /// Page-length select of the listing table
    pub show_all: Selector,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: Selector::id("username"),
            password: Selector::id("password"),
            remember: Selector::id("rememberMe"),
            submit: Selector::id("loginButton"),
            show_all: Selector::xpath("//div[@class='dataTables_length']//select"),
        }
    }
}

/// Gatekeeper settings
#[derive(Debug, Clone)]
pub struct GatekeeperConfig {
    pub login_url: String,
    pub listing_url: String,
    /// Case-insensitive substring of the URL once logged in
    pub authenticated_marker: String,
    /// Budget for login cycles and for listing navigation, each
    pub max_retries: u32,
    pub login_backoff: Duration,
    pub navigation_backoff: Duration,
    /// How long the login form gets to appear
    pub form_timeout: Duration,
    /// Upper bound on the post-submit redirect
    pub redirect_timeout: Duration,
    pub poll_interval: Duration,
    /// Option label selecting every listing row
    pub show_all_label: String,
    pub selectors: LoginSelectors,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            authenticated_marker: DEFAULT_AUTHENTICATED_MARKER.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            login_backoff: Duration::from_secs(3),
            navigation_backoff: Duration::from_secs(2),
            form_timeout: Duration::from_secs(5),
            redirect_timeout: Duration::from_secs(20),
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_all_label: "All".to_string(),
            selectors: LoginSelectors::default(),
        }
    }
}

/// Owns the session state machine for one run
pub struct SessionGatekeeper {
    config: GatekeeperConfig,
    credentials: Option<Credentials>,
    tracker: SessionTracker,
}

impl SessionGatekeeper {
    /// `credentials` is `None` when the environment did not provide them
    pub fn new(config: GatekeeperConfig, credentials: Option<Credentials>) -> Self {
        Self {
            config,
            credentials,
            tracker: SessionTracker::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn listing_url(&self) -> &str {
        &self.config.listing_url
    }

    /// Log in and open the listing page
    ///
    /// # Errors
    /// `Configuration` when credentials are missing (no navigation happens);
    /// `Session` when the login or navigation budget is exhausted.
    pub async fn establish_session<S: NavigableSession + ?Sized>(
        &mut self,
        session: &mut S,
    ) -> BackupResult<()> {
        let credentials = match self.credentials.clone().filter(Credentials::is_complete) {
            Some(credentials) => credentials,
            None => {
                self.transition(SessionState::Failed);
                return Err(BackupError::Configuration(
                    "portal credentials are missing (set ENROLLWARE_USERNAME and ENROLLWARE_PASSWORD)"
                        .to_string(),
                ));
            }
        };

        self.log_in(session, &credentials).await?;
        self.open_listing(session).await
    }

    async fn log_in<S: NavigableSession + ?Sized>(
        &mut self,
        session: &mut S,
        credentials: &Credentials,
    ) -> BackupResult<()> {
        let policy = RetryPolicy::new(self.config.max_retries, self.config.login_backoff);

        for attempt in policy.attempts() {
            self.transition(SessionState::LoggingIn);

            match self.login_attempt(&*session, credentials).await {
                Ok(true) => {
                    self.transition(SessionState::LoggedIn);
                    tracing::info!(attempt, "Logged in to portal");
                    return Ok(());
                }
                Ok(false) => {
                    tracing::warn!(attempt, "Login did not reach the authenticated area");
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Login attempt failed");
                }
            }

            policy.backoff_after("portal_login", attempt).await;
        }

        self.transition(SessionState::Failed);
        Err(BackupError::Session(format!(
            "login failed after {} attempt(s)",
            policy.max_attempts
        )))
    }

    /// One login cycle; `Ok(false)` when no redirect into the authenticated area
    async fn login_attempt<S: NavigableSession + ?Sized>(
        &self,
        session: &S,
        credentials: &Credentials,
    ) -> DriverResult<bool> {
        let selectors = &self.config.selectors;

        session.navigate_to(&self.config.login_url).await?;

        if !session
            .element_exists(&selectors.submit, self.config.form_timeout)
            .await
        {
            tracing::info!("Login form absent, session already authenticated");
            return Ok(true);
        }

        session
            .input_text(&selectors.username, &credentials.username)
            .await?;
        session
            .input_text(&selectors.password, &credentials.password)
            .await?;

        if session
            .element_exists(&selectors.remember, Duration::ZERO)
            .await
        {
            if let Err(e) = session.click_element(&selectors.remember).await {
                tracing::warn!(error = %e, "Could not toggle remember-me");
            }
        }

        session.click_element(&selectors.submit).await?;
        tracing::debug!("Credentials submitted, waiting for redirect");

        let redirected = wait_until(self.config.redirect_timeout, self.config.poll_interval, || async move {
            match session.current_url().await {
                Ok(url) => self.is_authenticated_url(&url),
                Err(_) => false,
            }
        })
        .await;

        Ok(redirected)
    }

    async fn open_listing<S: NavigableSession + ?Sized>(&mut self, session: &mut S) -> BackupResult<()> {
        let policy = RetryPolicy::new(self.config.max_retries, self.config.navigation_backoff);
        let listing_url = self.config.listing_url.clone();
        let url = listing_url.as_str();
        let shared: &S = session;

        let navigated = retry_fixed("listing_navigation", policy, || async move {
            shared.navigate_to(url).await
        })
        .await;

        match navigated {
            Ok(()) => {
                self.transition(SessionState::NavigatedToListing);
                tracing::info!(url = %listing_url, "Instructor listing opened");
                self.show_all_rows(shared).await;
                Ok(())
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Err(BackupError::Session(format!(
                    "could not open {} after {} attempt(s): {}",
                    listing_url, policy.max_attempts, e
                )))
            }
        }
    }

    async fn show_all_rows<S: NavigableSession + ?Sized>(&self, session: &S) {
        let result = session
            .select_option(&self.config.selectors.show_all, &self.config.show_all_label)
            .await;

        match result {
            Ok(()) => tracing::debug!(label = %self.config.show_all_label, "Listing shows all rows"),
            Err(e) => tracing::warn!(error = %e, "Could not select all listing rows, continuing with default page"),
        }
    }

    fn is_authenticated_url(&self, url: &str) -> bool {
        url.to_lowercase()
            .contains(&self.config.authenticated_marker.to_lowercase())
    }

    fn transition(&mut self, state: SessionState) {
        let transition = self.tracker.transition_to(state);
        tracing::info!(
            from = %transition.old_state,
            to = %transition.new_state,
            "Session gatekeeper state"
        );
    }
}
