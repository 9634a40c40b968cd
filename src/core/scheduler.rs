//! Fixed-interval polling scheduler with single-flight execution and
//! consecutive-failure escalation.
//!
//! A [`PollingScheduler`] is a handle to a driver task. The driver exclusively
//! owns the [`PollingRuntimeState`], the timer and every pending execution;
//! the handle only sends commands and reads published [`PollingStatus`]
//! snapshots.
//!
//! ```text
//! handle ──Command──► driver loop ◄── timer tick
//!   ▲                    │  ▲
//!   │ PollingStatus      │  └── completion (start order)
//!   └──── watch ◄────────┤
//!                        └──► escalation hook (once, at threshold)
//! ```
//!
//! Dropping the handle or calling [`shutdown`](PollingScheduler::shutdown)
//! tears the driver down: the state is marked dead before the timer is
//! released and pending executions are cancelled, so nothing that was in
//! flight can touch the state afterwards.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesOrdered, StreamExt};
use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::time::Interval;
use tracing::{debug, error, info, warn};

use super::error::{NetworkError, SchedulerError};
use super::spawn::Spawn;
use super::state::{FailurePolicy, PollingRuntimeState, PollingStatus, Settlement, TickDecision};
use super::work::{UnitOfWork, WorkResult};
use crate::config::PollingConfig;

/// Receives the consecutive-failure error when a scheduler escalates.
pub type EscalationHook = Arc<dyn Fn(NetworkError) + Send + Sync>;

enum Command {
    Start,
    Stop,
    Restart,
    SetEnabled(bool),
    SetInterval(Duration),
    Shutdown,
}

enum Event {
    Command(Command),
    Completed(WorkResult),
    Tick,
}

/// Handle to a running polling scheduler.
///
/// Commands are applied by the driver in the order they are sent. Read
/// accessors return the most recently published snapshot.
pub struct PollingScheduler {
    name: Arc<str>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<PollingStatus>,
}

impl fmt::Debug for PollingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingScheduler")
            .field("name", &self.name)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl PollingScheduler {
    /// Validate `config` and launch a driver for `work` on `spawner`.
    ///
    /// The timer is armed immediately when `config.enabled` is set.
    /// `escalation` receives the single consecutive-failure error raised when
    /// the threshold is reached with escalation enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if validation fails.
    pub fn launch<W, S>(
        name: impl Into<Arc<str>>,
        config: PollingConfig,
        work: W,
        escalation: Option<EscalationHook>,
        spawner: &S,
    ) -> Result<Self, SchedulerError>
    where
        W: UnitOfWork,
        S: Spawn,
    {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let name = name.into();
        let state = PollingRuntimeState::new();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(state.status());

        let driver = Driver {
            name: Arc::clone(&name),
            policy: FailurePolicy::from(&config),
            config,
            work: Arc::new(work),
            state,
            executions: FuturesOrdered::new(),
            commands: command_rx,
            status: status_tx,
            escalation,
        };
        spawner.spawn(driver.run());

        Ok(Self {
            name,
            commands,
            status,
        })
    }

    /// Name used in log records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arm the timer. No-op if already armed.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Disarm the timer. Idempotent; keeps the failure counter.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Stop, then start.
    pub fn restart(&self) {
        self.send(Command::Restart);
    }

    /// Enable (start) or disable (stop) polling.
    pub fn set_enabled(&self, enabled: bool) {
        self.send(Command::SetEnabled(enabled));
    }

    /// Change the tick period, restarting the timer if it is armed.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for a period under one
    /// millisecond and [`SchedulerError::DriverGone`] if the scheduler was
    /// torn down.
    pub fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        if interval.as_millis() == 0 {
            return Err(SchedulerError::InvalidConfig(
                "interval must be greater than 0".into(),
            ));
        }
        if self.send(Command::SetInterval(interval)) {
            Ok(())
        } else {
            Err(SchedulerError::DriverGone)
        }
    }

    /// Tear the scheduler down. Pending executions are cancelled.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Whether an execution is pending.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status.borrow().is_processing()
    }

    /// Consecutive failures since the last success.
    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.status.borrow().error_count
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn status(&self) -> PollingStatus {
        *self.status.borrow()
    }

    /// Receiver for status snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PollingStatus> {
        self.status.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DriverGone`] if the driver exits first.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<PollingStatus, SchedulerError>
    where
        F: FnMut(&PollingStatus) -> bool,
    {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SchedulerError::DriverGone)?;
        Ok(*status)
    }

    fn send(&self, command: Command) -> bool {
        if self.commands.send(command).is_err() {
            debug!(scheduler = %self.name, "driver gone; command ignored");
            return false;
        }
        true
    }
}

struct Driver<W> {
    name: Arc<str>,
    config: PollingConfig,
    policy: FailurePolicy,
    work: Arc<W>,
    state: PollingRuntimeState,
    executions: FuturesOrdered<BoxFuture<'static, WorkResult>>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<PollingStatus>,
    escalation: Option<EscalationHook>,
}

impl<W: UnitOfWork> Driver<W> {
    async fn run(mut self) {
        info!(
            scheduler = %self.name,
            interval_ms = self.config.interval_ms,
            wait_for_previous = self.config.wait_for_previous,
            max_consecutive_failures = ?self.config.max_consecutive_failures,
            escalate = self.config.escalate_on_max_failures,
            "polling scheduler started"
        );
        if self.config.enabled {
            self.start();
        }
        self.publish();

        loop {
            let event = tokio::select! {
                biased;
                cmd = self.commands.recv() => Event::Command(cmd.unwrap_or(Command::Shutdown)),
                Some(outcome) = self.executions.next(), if !self.executions.is_empty() => {
                    Event::Completed(outcome)
                }
                () = next_tick(self.state.timer_mut()) => Event::Tick,
            };

            match event {
                Event::Command(Command::Shutdown) => break,
                Event::Command(cmd) => self.apply(cmd),
                Event::Completed(outcome) => self.settle(outcome),
                Event::Tick => self.tick(),
            }
            self.publish();
        }

        self.state.tear_down();
        let cancelled = self.executions.len();
        self.executions = FuturesOrdered::new();
        self.publish();
        info!(scheduler = %self.name, cancelled, "polling scheduler torn down");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Restart => {
                self.stop();
                self.start();
            }
            Command::SetEnabled(enabled) => {
                self.config.enabled = enabled;
                if enabled {
                    self.start();
                } else {
                    self.stop();
                }
            }
            Command::SetInterval(interval) => {
                self.config = self.config.clone().with_interval(interval);
                if self.state.is_armed() {
                    self.stop();
                    self.start();
                }
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self) {
        if !self.state.arm(self.config.interval()) {
            return;
        }
        debug!(scheduler = %self.name, interval_ms = self.config.interval_ms, "timer armed");
        if self.config.run_immediately {
            self.tick();
        }
    }

    fn stop(&mut self) {
        if self.state.disarm() {
            debug!(scheduler = %self.name, "timer disarmed");
        }
    }

    fn tick(&mut self) {
        match self.state.admit(self.config.wait_for_previous) {
            TickDecision::Execute => {
                let work = Arc::clone(&self.work);
                self.executions.push_back(execute(work).boxed());
            }
            TickDecision::Dropped => {
                debug!(scheduler = %self.name, "tick dropped: previous execution still in flight");
            }
            TickDecision::Inactive => {}
        }
    }

    fn settle(&mut self, outcome: WorkResult) {
        if let Err(e) = &outcome {
            warn!(scheduler = %self.name, error = %e, "polling execution failed");
        }

        match self.state.settle(outcome, self.policy) {
            Settlement::Ignored => {}
            Settlement::Reset { cleared } => {
                if cleared > 0 {
                    info!(scheduler = %self.name, cleared, "execution succeeded; failure count reset");
                }
            }
            Settlement::Skipped(reason) => {
                debug!(scheduler = %self.name, %reason, "execution skipped");
            }
            Settlement::Counted { failures } => {
                debug!(scheduler = %self.name, failures, "consecutive failure counted");
            }
            Settlement::Halted { failures } => {
                error!(scheduler = %self.name, failures, "failure threshold reached; polling halted");
            }
            Settlement::Escalated(err) => {
                error!(
                    scheduler = %self.name,
                    failures = err.consecutive_failure_count(),
                    error_id = %err.id(),
                    "failure threshold reached; polling halted and escalated"
                );
                match &self.escalation {
                    Some(hook) => hook(err),
                    None => warn!(scheduler = %self.name, "no escalation hook installed; error dropped"),
                }
            }
        }
    }

    fn publish(&self) {
        let next = self.state.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

async fn next_tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn execute<W: UnitOfWork>(work: Arc<W>) -> WorkResult {
    match AssertUnwindSafe(work.run()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!("unit of work panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
