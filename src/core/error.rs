//! Error types for the polling engine.
//!
//! Three layers:
//!
//! - [`SchedulerError`]: failures of the engine itself (configuration, lifecycle).
//! - [`NetworkError`]: the network-origin family a boundary is allowed to intercept,
//!   tagged by [`NetworkErrorKind`].
//! - [`Fault`]: anything raised across the scheduler/boundary seam. Its
//!   [`Fault::Foreign`] arm always re-propagates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::util::clock::now_ms;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The scheduler's driver task is no longer running.
    #[error("scheduler driver has shut down")]
    DriverGone,
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Origin of a [`NetworkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    /// Transport failure or unexpected response.
    Transport,
    /// An I/O deadline expired.
    Timeout,
    /// The scheduler's consecutive-failure threshold was reached.
    ConsecutiveFailure,
}

impl NetworkErrorKind {
    /// Returns a short stable label for logs and metrics.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Transport => "network_transport",
            Self::Timeout => "network_timeout",
            Self::ConsecutiveFailure => "network_consecutive_failure",
        }
    }
}

/// Opaque, shared handle to the failure behind a [`NetworkError`].
///
/// Carried for diagnostics only; the engine never inspects it.
#[derive(Clone)]
pub struct Cause(Arc<anyhow::Error>);

impl Cause {
    /// Wrap any error as a cause.
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(err.into()))
    }

    /// Borrow the underlying error.
    #[must_use]
    pub fn as_error(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl From<anyhow::Error> for Cause {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

/// A network-origin error.
///
/// Every constructed value is a distinct instance with its own [`id`](Self::id),
/// so consumers can tell a re-delivered error from a new one.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NetworkError {
    id: Uuid,
    kind: NetworkErrorKind,
    message: String,
    consecutive_failures: u32,
    original_cause: Option<Cause>,
    timestamp_ms: u128,
}

impl NetworkError {
    fn with_kind(kind: NetworkErrorKind, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message,
            consecutive_failures: 0,
            original_cause: None,
            timestamp_ms: now_ms(),
        }
    }

    /// Transport failure (connection refused, reset, non-2xx status, bad body).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_kind(NetworkErrorKind::Transport, message.into())
    }

    /// Deadline expiry of a single request.
    #[must_use]
    pub fn timeout(deadline: Duration) -> Self {
        Self::with_kind(
            NetworkErrorKind::Timeout,
            format!("request timed out after {} ms", deadline.as_millis()),
        )
    }

    /// Threshold breach raised by the scheduler.
    ///
    /// `count` is clamped to at least 1.
    #[must_use]
    pub fn consecutive_failures(count: u32, last_cause: Option<Cause>) -> Self {
        let count = count.max(1);
        let mut err = Self::with_kind(
            NetworkErrorKind::ConsecutiveFailure,
            format!("network connection unstable ({count} consecutive failures)"),
        );
        err.consecutive_failures = count;
        err.original_cause = last_cause;
        err
    }

    /// Attach the originating failure.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.original_cause = Some(cause.into());
        self
    }

    /// Record a failure count on a non-escalation error.
    #[must_use]
    pub const fn with_consecutive_failures(mut self, count: u32) -> Self {
        self.consecutive_failures = count;
        self
    }

    /// Unique identity of this error instance.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Origin tag.
    #[must_use]
    pub const fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consecutive failures at the time the error was raised (0 if unrelated).
    #[must_use]
    pub const fn consecutive_failure_count(&self) -> u32 {
        self.consecutive_failures
    }

    /// The failure that triggered this error, if recorded.
    #[must_use]
    pub const fn original_cause(&self) -> Option<&Cause> {
        self.original_cause.as_ref()
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u128 {
        self.timestamp_ms
    }

    /// `true` for deadline expiries.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == NetworkErrorKind::Timeout
    }

    /// `true` for scheduler threshold breaches.
    #[must_use]
    pub fn is_consecutive_failure(&self) -> bool {
        self.kind == NetworkErrorKind::ConsecutiveFailure
    }

    /// Whether `err` carries a [`NetworkError`] at its top level.
    #[must_use]
    pub fn is_network_error(err: &anyhow::Error) -> bool {
        err.is::<Self>()
    }
}

/// Anything raised across the scheduler/boundary seam.
#[derive(Debug, Error)]
pub enum Fault {
    /// A member of the network error family; eligible for interception.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Any other failure; must reach an outer handler unchanged.
    #[error(transparent)]
    Foreign(anyhow::Error),
}

impl Fault {
    /// Sort an opaque error into the network family or the foreign arm.
    #[must_use]
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<NetworkError>() {
            Ok(network) => Self::Network(network),
            Err(other) => Self::Foreign(other),
        }
    }

    /// The network error, if this fault is one.
    #[must_use]
    pub const fn as_network(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(err) => Some(err),
            Self::Foreign(_) => None,
        }
    }

    /// Convert back into an opaque error without altering a foreign payload.
    #[must_use]
    pub fn into_error(self) -> anyhow::Error {
        match self {
            Self::Network(err) => anyhow::Error::new(err),
            Self::Foreign(err) => err,
        }
    }
}
