//! Supervised capture session: one scheduler under one network boundary.
//!
//! The scheduler's escalation hook feeds the boundary. Whenever the boundary
//! is intercepted the current scheduler instance is torn down, so no further
//! submissions happen until [`CaptureSession::recover`] resets the boundary
//! and launches a fresh instance whose failure count starts at zero.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::config::PollingConfig;
use crate::core::{
    BoundaryState, NetworkBoundary, PollingScheduler, PollingStatus, Recovery, RecoveryAction,
    SchedulerError, SchedulerPhase, Spawn, UnitOfWork,
};

type SchedulerSlot = Mutex<Arc<PollingScheduler>>;

/// A unit of work polled under a [`NetworkBoundary`].
pub struct CaptureSession<W, S> {
    name: Arc<str>,
    config: Mutex<PollingConfig>,
    work: Arc<W>,
    boundary: Arc<NetworkBoundary>,
    scheduler: Arc<SchedulerSlot>,
    spawner: S,
    /// Dropped with the session, which stops the intercept watcher.
    _stop_watcher: oneshot::Sender<()>,
}

impl<W, S> CaptureSession<W, S>
where
    W: UnitOfWork,
    S: Spawn,
{
    /// Launch `work` under `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if `config` fails validation.
    pub fn launch(
        name: impl Into<Arc<str>>,
        config: PollingConfig,
        work: W,
        boundary: Arc<NetworkBoundary>,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        let name = name.into();
        let work = Arc::new(work);
        let scheduler = PollingScheduler::launch(
            Arc::clone(&name),
            config.clone(),
            Arc::clone(&work),
            Some(boundary.escalation_hook()),
            &spawner,
        )?;
        let slot = Arc::new(Mutex::new(Arc::new(scheduler)));
        let (stop_watcher, stopped) = oneshot::channel();

        spawner.spawn(freeze_on_intercept(
            Arc::clone(&name),
            boundary.subscribe(),
            Arc::downgrade(&slot),
            stopped,
        ));
        info!(session = %name, "capture session launched");

        Ok(Self {
            name,
            config: Mutex::new(config),
            work,
            boundary,
            scheduler: slot,
            spawner,
            _stop_watcher: stop_watcher,
        })
    }

    /// The supervising boundary.
    #[must_use]
    pub const fn boundary(&self) -> &Arc<NetworkBoundary> {
        &self.boundary
    }

    /// The unit of work shared by every scheduler instance.
    #[must_use]
    pub const fn work(&self) -> &Arc<W> {
        &self.work
    }

    /// The current scheduler instance.
    #[must_use]
    pub fn scheduler(&self) -> Arc<PollingScheduler> {
        Arc::clone(&self.scheduler.lock())
    }

    /// Status of the current scheduler instance.
    #[must_use]
    pub fn status(&self) -> PollingStatus {
        self.scheduler.lock().status()
    }

    /// Whether the boundary is intercepted.
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        self.boundary.is_intercepted()
    }

    /// Enable or disable polling.
    ///
    /// While intercepted the setting is only stored; the scheduler launched
    /// by [`recover`](Self::recover) starts from it.
    pub fn set_enabled(&self, enabled: bool) {
        self.config.lock().enabled = enabled;
        if self.boundary.is_intercepted() {
            debug!(session = %self.name, enabled, "polling frozen; enabled applies on recovery");
            return;
        }
        self.scheduler.lock().set_enabled(enabled);
    }

    /// Change the tick period.
    ///
    /// While intercepted the period is only stored; the scheduler launched
    /// by [`recover`](Self::recover) ticks at it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for a period under one
    /// millisecond, otherwise propagates [`PollingScheduler::set_interval`]
    /// errors.
    pub fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.as_millis() == 0 {
            return Err(SchedulerError::InvalidConfig(
                "interval must be greater than 0".into(),
            ));
        }
        {
            let mut config = self.config.lock();
            *config = config.clone().with_interval(interval);
        }
        if self.boundary.is_intercepted() {
            debug!(session = %self.name, "polling frozen; interval applies on recovery");
            return Ok(());
        }
        self.scheduler.lock().set_interval(interval)
    }

    /// Reset the boundary and replace the scheduler with a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the stored configuration
    /// no longer validates; the boundary is reset regardless.
    pub fn recover(&self, action: RecoveryAction) -> Result<Recovery, SchedulerError> {
        let mut slot = self.scheduler.lock();
        let recovery = self.boundary.handle(action);

        let config = self.config.lock().clone();
        let fresh = PollingScheduler::launch(
            Arc::clone(&self.name),
            config,
            Arc::clone(&self.work),
            Some(self.boundary.escalation_hook()),
            &self.spawner,
        )?;
        slot.shutdown();
        *slot = Arc::new(fresh);

        info!(session = %self.name, ?action, "capture session recovered");
        Ok(recovery)
    }

    /// Tear down the current scheduler.
    pub fn shutdown(&self) {
        self.scheduler.lock().shutdown();
    }
}

async fn freeze_on_intercept(
    name: Arc<str>,
    mut state: watch::Receiver<BoundaryState>,
    slot: Weak<SchedulerSlot>,
    mut stopped: oneshot::Receiver<()>,
) {
    loop {
        let intercepted = state.borrow_and_update().error().is_some();
        {
            let Some(strong) = slot.upgrade() else {
                break;
            };
            if intercepted {
                let scheduler = strong.lock();
                if scheduler.status().phase != SchedulerPhase::TornDown {
                    info!(session = %name, "boundary intercepted; tearing scheduler down");
                    scheduler.shutdown();
                }
            }
        }

        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut stopped => break,
        }
    }
    debug!(session = %name, "intercept watcher stopped");
}
