//! Supervisor that intercepts network-origin failures and freezes operation
//! until an explicit reset.
//!
//! A [`NetworkBoundary`] has two states. In [`BoundaryState::Normal`] the
//! protected subtree runs; once a [`NetworkError`] is intercepted it moves to
//! [`BoundaryState::Intercepted`] and only the fallback is offered. Any other
//! fault passes straight through. [`reset`](NetworkBoundary::reset) is the
//! only way back; it never re-arms a scheduler on its own.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{Fault, NetworkError};
use super::scheduler::EscalationHook;
use crate::config::relay::DEFAULT_REAUTH_PATH;

/// Number of reported error ids remembered for de-duplication.
const REPORTED_IDS: usize = 64;

/// Observable state of a boundary.
#[derive(Debug, Clone)]
pub enum BoundaryState {
    /// The protected subtree runs.
    Normal,
    /// A network error was intercepted; the fallback is shown.
    Intercepted(NetworkError),
}

impl BoundaryState {
    /// The intercepted error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&NetworkError> {
        match self {
            Self::Normal => None,
            Self::Intercepted(err) => Some(err),
        }
    }
}

/// User-triggered recovery offered by the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Reset and resume in place.
    Retry,
    /// Reset and send the user through authentication again.
    ReAuthenticate,
}

/// What the caller should do after a recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Continue where operation stopped.
    Resume,
    /// Navigate to the given path.
    Redirect(String),
}

/// Presentation model for the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackView {
    /// Headline.
    pub title: String,
    /// Message of the intercepted error.
    pub description: String,
    /// Failure count line, present when the error carries one.
    pub detail: Option<String>,
    /// Things the user can check.
    pub suggestions: Vec<String>,
    /// Recovery actions in display order.
    pub actions: Vec<RecoveryAction>,
}

/// Builds the fallback model for an intercepted error.
pub trait Fallback: Send + Sync {
    /// Produce the view for `error`.
    fn view(&self, error: &NetworkError) -> FallbackView;
}

/// Stock fallback: fixed headline and description, the failure count when
/// known, connectivity suggestions and both recovery actions.
///
/// The intercepted error's own message is not shown; it is available to the
/// `on_error` hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFallback;

impl Fallback for DefaultFallback {
    fn view(&self, error: &NetworkError) -> FallbackView {
        let failures = error.consecutive_failure_count();
        FallbackView {
            title: "Network connection unstable".into(),
            description: "The connection to the server is unstable. \
                          Check your network status and try again."
                .into(),
            detail: (failures > 0).then(|| format!("{failures} consecutive failed requests")),
            suggestions: vec![
                "Check your internet connection".into(),
                "Check your Wi-Fi or mobile data connection".into(),
                "Try again in a moment".into(),
            ],
            actions: vec![RecoveryAction::ReAuthenticate, RecoveryAction::Retry],
        }
    }
}

/// Callback invoked once per distinct intercepted error.
pub type ErrorHook = Arc<dyn Fn(&NetworkError) + Send + Sync>;

/// Supervisor for the network error family.
pub struct NetworkBoundary {
    state: watch::Sender<BoundaryState>,
    reported: Mutex<VecDeque<Uuid>>,
    on_error: Option<ErrorHook>,
    fallback: Arc<dyn Fallback>,
    reauth_path: String,
}

impl fmt::Debug for NetworkBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkBoundary")
            .field("state", &*self.state.borrow())
            .field("reauth_path", &self.reauth_path)
            .finish_non_exhaustive()
    }
}

impl Default for NetworkBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBoundary {
    /// Boundary in the normal state with the default fallback and no hook.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(BoundaryState::Normal);
        Self {
            state,
            reported: Mutex::new(VecDeque::with_capacity(REPORTED_IDS)),
            on_error: None,
            fallback: Arc::new(DefaultFallback),
            reauth_path: DEFAULT_REAUTH_PATH.to_string(),
        }
    }

    /// Install the error-reporting hook.
    #[must_use]
    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&NetworkError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Substitute the fallback model.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Fallback + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Path returned by [`RecoveryAction::ReAuthenticate`].
    #[must_use]
    pub fn with_reauth_path(mut self, path: impl Into<String>) -> Self {
        self.reauth_path = path.into();
        self
    }

    /// Intercept a fault.
    ///
    /// Network faults freeze the boundary and are reported to the hook once
    /// per error instance. Foreign faults are handed back untouched.
    ///
    /// # Errors
    ///
    /// Returns the foreign payload unchanged for [`Fault::Foreign`].
    pub fn intercept(&self, fault: Fault) -> Result<(), anyhow::Error> {
        match fault {
            Fault::Network(err) => {
                self.capture(err);
                Ok(())
            }
            Fault::Foreign(err) => {
                debug!(error = %err, "foreign fault passed through network boundary");
                Err(err)
            }
        }
    }

    fn capture(&self, err: NetworkError) {
        let first_report = {
            let mut reported = self.reported.lock();
            if reported.contains(&err.id()) {
                false
            } else {
                if reported.len() >= REPORTED_IDS {
                    reported.pop_front();
                }
                reported.push_back(err.id());
                true
            }
        };

        let entered = self.state.send_if_modified(|state| match state {
            BoundaryState::Normal => {
                *state = BoundaryState::Intercepted(err.clone());
                true
            }
            BoundaryState::Intercepted(_) => false,
        });

        if entered {
            warn!(
                kind = err.kind().as_label(),
                failures = err.consecutive_failure_count(),
                error_id = %err.id(),
                "network error intercepted; operation frozen"
            );
        } else {
            debug!(error_id = %err.id(), "network error received while already intercepted");
        }

        if first_report {
            if let Some(hook) = &self.on_error {
                hook(&err);
            }
        }
    }

    /// Clear the interception. Returns `true` if the boundary was intercepted.
    pub fn reset(&self) -> bool {
        let cleared = self.state.send_if_modified(|state| match state {
            BoundaryState::Intercepted(_) => {
                *state = BoundaryState::Normal;
                true
            }
            BoundaryState::Normal => false,
        });
        if cleared {
            info!("network boundary reset");
        }
        cleared
    }

    /// Apply a recovery action. Both actions reset the boundary.
    pub fn handle(&self, action: RecoveryAction) -> Recovery {
        self.reset();
        match action {
            RecoveryAction::Retry => Recovery::Resume,
            RecoveryAction::ReAuthenticate => Recovery::Redirect(self.reauth_path.clone()),
        }
    }

    /// Run `normal` while in the normal state, otherwise `fallback` with the error.
    pub fn render<T>(
        &self,
        normal: impl FnOnce() -> T,
        fallback: impl FnOnce(&NetworkError) -> T,
    ) -> T {
        let intercepted = self.state.borrow().error().cloned();
        match intercepted {
            None => normal(),
            Some(err) => fallback(&err),
        }
    }

    /// Fallback model for the intercepted error, if any.
    #[must_use]
    pub fn fallback_view(&self) -> Option<FallbackView> {
        self.state.borrow().error().map(|err| self.fallback.view(err))
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BoundaryState {
        self.state.borrow().clone()
    }

    /// Whether a network error is currently intercepted.
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        self.state.borrow().error().is_some()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoundaryState> {
        self.state.subscribe()
    }

    /// Number of live state receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Escalation hook that feeds a scheduler's threshold error into this boundary.
    #[must_use]
    pub fn escalation_hook(self: &Arc<Self>) -> EscalationHook {
        let boundary = Arc::clone(self);
        Arc::new(move |err: NetworkError| boundary.capture(err))
    }
}
