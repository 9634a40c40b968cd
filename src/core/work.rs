//! The unit of work a scheduler executes on every admitted tick.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why an execution ended early without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The capture source has no current frame yet.
    CaptureNotReady,
    /// No position fix is available.
    PositionUnavailable,
    /// The capture source produced an empty snapshot.
    EmptyFrame,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CaptureNotReady => "capture source not ready",
            Self::PositionUnavailable => "position fix unavailable",
            Self::EmptyFrame => "empty frame",
        })
    }
}

/// Non-failing outcome of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Work was submitted and acknowledged. Resets the failure counter.
    Submitted,
    /// A precondition was unmet. Leaves the failure counter untouched.
    Skipped(SkipReason),
}

/// Result of one execution. Any `Err` counts as a failure.
pub type WorkResult = Result<Completion, anyhow::Error>;

/// Asynchronous unit of work driven by a [`PollingScheduler`](super::PollingScheduler).
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use capture_relay::core::{Completion, UnitOfWork, WorkResult};
///
/// struct Ping;
///
/// #[async_trait]
/// impl UnitOfWork for Ping {
///     async fn run(&self) -> WorkResult {
///         Ok(Completion::Submitted)
///     }
/// }
/// ```
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    /// Execute once.
    async fn run(&self) -> WorkResult;
}

#[async_trait]
impl<W> UnitOfWork for Arc<W>
where
    W: UnitOfWork + ?Sized,
{
    async fn run(&self) -> WorkResult {
        (**self).run().await
    }
}

/// Closure-backed unit of work; the closure creates a fresh future per execution.
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Wrap a closure.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for WorkFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> UnitOfWork for WorkFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    async fn run(&self) -> WorkResult {
        (self.f)().await
    }
}
