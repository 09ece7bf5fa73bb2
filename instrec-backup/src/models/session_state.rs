//! Portal session state machine
//!
//! LOGGED_OUT → LOGGING_IN → LOGGED_IN → NAVIGATED_TO_LISTING, with FAILED as the
//! terminal state once a retry budget runs out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Portal session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No login attempted yet
    LoggedOut,
    /// Login page loaded, credentials being submitted
    LoggingIn,
    /// Current URL is inside the authenticated area
    LoggedIn,
    /// Instructor listing loaded with all rows shown
    NavigatedToListing,
    /// Retry budget exhausted or credentials missing
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::LoggedOut => "LOGGED_OUT",
            SessionState::LoggingIn => "LOGGING_IN",
            SessionState::LoggedIn => "LOGGED_IN",
            SessionState::NavigatedToListing => "NAVIGATED_TO_LISTING",
            SessionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Current state plus the transition history of one gatekeeper run
#[derive(Debug, Clone)]
pub struct SessionTracker {
    state: SessionState,
    history: Vec<StateTransition>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Transition to new state; self-transitions (retries) are recorded too
    pub fn transition_to(&mut self, new_state: SessionState) -> StateTransition {
        let transition = StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.history.push(transition.clone());

        tracing::debug!(
            from = %transition.old_state,
            to = %transition.new_state,
            "Session state transition"
        );

        transition
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
