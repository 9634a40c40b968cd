//! Runtime state of one scheduler and its transitions.
//!
//! [`PollingRuntimeState`] is owned by exactly one scheduler driver. Every
//! mutation goes through [`admit`](PollingRuntimeState::admit),
//! [`settle`](PollingRuntimeState::settle), the arm/disarm pair, or
//! [`tear_down`](PollingRuntimeState::tear_down), so no locking is involved.
//!
//! ```text
//! Idle ──arm──► Armed ──tick──► Dropped            (single-flight busy)
//!                 ▲      │
//!                 │      └────► Executing ──► Succeeded / Skipped / Failed ──► Armed
//!                 │                      └──► FailedAtThreshold ──► Halted [──► Escalated]
//!                 └──────────── arm (restart) ◄────────────────────────┘
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::error::{Cause, NetworkError};
use super::work::{Completion, SkipReason, WorkResult};
use crate::config::PollingConfig;

/// Coarse lifecycle phase of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// Timer not armed.
    Idle,
    /// Timer armed and ticking.
    Armed,
    /// Timer disarmed by the failure threshold; nothing raised.
    Halted,
    /// Timer disarmed by the failure threshold and the error was escalated.
    Escalated,
    /// Scheduler torn down; no further effects.
    TornDown,
}

/// Failure handling derived from [`PollingConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Threshold that halts the timer.
    pub max_consecutive_failures: Option<u32>,
    /// Whether reaching the threshold escalates.
    pub escalate: bool,
}

impl From<&PollingConfig> for FailurePolicy {
    fn from(cfg: &PollingConfig) -> Self {
        Self {
            max_consecutive_failures: cfg.max_consecutive_failures,
            escalate: cfg.escalate_on_max_failures,
        }
    }
}

/// Decision taken for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Run the unit of work; the in-flight marker is held.
    Execute,
    /// Single-flight is on and an execution is pending.
    Dropped,
    /// The scheduler has been torn down.
    Inactive,
}

/// Effect of one completed execution.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// Completion arrived after teardown and changed nothing.
    Ignored,
    /// Success; the failure counter was reset from the given value.
    Reset {
        /// Failures cleared by this success.
        cleared: u32,
    },
    /// Silent skip; nothing counted.
    Skipped(SkipReason),
    /// Failure counted, threshold not reached.
    Counted {
        /// Current consecutive failures.
        failures: u32,
    },
    /// Threshold reached; timer disarmed without escalation.
    Halted {
        /// Current consecutive failures.
        failures: u32,
    },
    /// Threshold reached; timer disarmed and this error must be delivered.
    Escalated(NetworkError),
}

/// Point-in-time view of a scheduler, published after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingStatus {
    /// Lifecycle phase.
    pub phase: SchedulerPhase,
    /// Executions currently pending.
    pub in_flight: usize,
    /// Consecutive failures since the last success.
    pub error_count: u32,
    /// Executions started since creation.
    pub executions: u64,
    /// Ticks dropped by single-flight since creation.
    pub dropped_ticks: u64,
    /// Executions that ended in a silent skip since creation.
    pub skipped: u64,
}

impl PollingStatus {
    /// Whether an execution is pending.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.in_flight > 0
    }

    /// Whether the timer is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.phase == SchedulerPhase::Armed
    }
}

/// Mutable state exclusively owned by one scheduler driver.
#[derive(Debug)]
pub struct PollingRuntimeState {
    timer: Option<Interval>,
    in_flight: usize,
    consecutive_failures: u32,
    alive: bool,
    halted: bool,
    escalated: bool,
    executions: u64,
    dropped_ticks: u64,
    skipped: u64,
}

impl Default for PollingRuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingRuntimeState {
    /// Fresh, alive, disarmed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timer: None,
            in_flight: 0,
            consecutive_failures: 0,
            alive: true,
            halted: false,
            escalated: false,
            executions: 0,
            dropped_ticks: 0,
            skipped: 0,
        }
    }

    /// Whether the timer is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether an execution is pending.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.in_flight > 0
    }

    /// Consecutive failures since the last success.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// `false` once torn down.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Arm a fixed-cadence timer whose first tick is one `period` away.
    ///
    /// Returns `false` (and changes nothing) if already armed or torn down.
    /// Must be called within a Tokio runtime.
    pub fn arm(&mut self, period: Duration) -> bool {
        if !self.alive || self.timer.is_some() {
            return false;
        }
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.timer = Some(timer);
        self.halted = false;
        self.escalated = false;
        true
    }

    /// Disarm the timer. Returns `true` if it was armed.
    pub fn disarm(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// The armed timer, for the driver to await.
    pub fn timer_mut(&mut self) -> Option<&mut Interval> {
        self.timer.as_mut()
    }

    /// Decide what to do with a tick and acquire the in-flight marker on `Execute`.
    pub fn admit(&mut self, wait_for_previous: bool) -> TickDecision {
        if !self.alive {
            return TickDecision::Inactive;
        }
        if wait_for_previous && self.in_flight > 0 {
            self.dropped_ticks += 1;
            return TickDecision::Dropped;
        }
        self.in_flight += 1;
        self.executions += 1;
        TickDecision::Execute
    }

    /// Release the in-flight marker for one execution and apply its outcome.
    ///
    /// The marker is released on every path; the counters are only touched
    /// while alive.
    pub fn settle(&mut self, outcome: WorkResult, policy: FailurePolicy) -> Settlement {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !self.alive {
            return Settlement::Ignored;
        }

        let err = match outcome {
            Ok(Completion::Submitted) => {
                let cleared = std::mem::take(&mut self.consecutive_failures);
                return Settlement::Reset { cleared };
            }
            Ok(Completion::Skipped(reason)) => {
                self.skipped += 1;
                return Settlement::Skipped(reason);
            }
            Err(err) => err,
        };

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let failures = self.consecutive_failures;

        let reached = match policy.max_consecutive_failures {
            Some(max) => failures >= max,
            None => false,
        };
        if !reached {
            return Settlement::Counted { failures };
        }

        self.disarm();
        self.halted = true;
        if policy.escalate && !self.escalated {
            self.escalated = true;
            return Settlement::Escalated(NetworkError::consecutive_failures(
                failures,
                Some(Cause::from(err)),
            ));
        }
        Settlement::Halted { failures }
    }

    /// Mark the state dead, then release the timer and the in-flight marker.
    ///
    /// The driver drops every pending execution right after this call.
    pub fn tear_down(&mut self) {
        self.alive = false;
        self.timer = None;
        self.in_flight = 0;
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SchedulerPhase {
        if !self.alive {
            SchedulerPhase::TornDown
        } else if self.timer.is_some() {
            SchedulerPhase::Armed
        } else if self.escalated {
            SchedulerPhase::Escalated
        } else if self.halted {
            SchedulerPhase::Halted
        } else {
            SchedulerPhase::Idle
        }
    }

    /// Snapshot for publication.
    #[must_use]
    pub const fn status(&self) -> PollingStatus {
        PollingStatus {
            phase: self.phase(),
            in_flight: self.in_flight,
            error_count: self.consecutive_failures,
            executions: self.executions,
            dropped_ticks: self.dropped_ticks,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALT_AT_3: FailurePolicy = FailurePolicy {
        max_consecutive_failures: Some(3),
        escalate: false,
    };

    const ESCALATE_AT_3: FailurePolicy = FailurePolicy {
        max_consecutive_failures: Some(3),
        escalate: true,
    };

    fn fail() -> WorkResult {
        Err(anyhow::anyhow!("boom"))
    }

    fn run(state: &mut PollingRuntimeState, outcome: WorkResult, policy: FailurePolicy) -> Settlement {
        assert_eq!(state.admit(true), TickDecision::Execute);
        state.settle(outcome, policy)
    }

    #[test]
    fn success_resets_counter() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), HALT_AT_3);
        run(&mut state, fail(), HALT_AT_3);
        assert_eq!(state.consecutive_failures(), 2);
        assert!(matches!(
            run(&mut state, Ok(Completion::Submitted), HALT_AT_3),
            Settlement::Reset { cleared: 2 }
        ));
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn skip_leaves_counter() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), HALT_AT_3);
        let s = run(&mut state, Ok(Completion::Skipped(SkipReason::CaptureNotReady)), HALT_AT_3);
        assert!(matches!(s, Settlement::Skipped(SkipReason::CaptureNotReady)));
        assert_eq!(state.consecutive_failures(), 1);
        assert_eq!(state.status().skipped, 1);
    }

    #[test]
    fn busy_tick_is_dropped_only_with_single_flight() {
        let mut state = PollingRuntimeState::new();
        assert_eq!(state.admit(true), TickDecision::Execute);
        assert_eq!(state.admit(true), TickDecision::Dropped);
        assert_eq!(state.admit(false), TickDecision::Execute);
        assert_eq!(state.status().in_flight, 2);
        assert_eq!(state.status().dropped_ticks, 1);
    }

    #[test]
    fn threshold_halts_without_escalation() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), HALT_AT_3);
        run(&mut state, fail(), HALT_AT_3);
        assert!(matches!(run(&mut state, fail(), HALT_AT_3), Settlement::Halted { failures: 3 }));
        assert_eq!(state.phase(), SchedulerPhase::Halted);
    }

    #[test]
    fn threshold_escalates_once() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), ESCALATE_AT_3);
        run(&mut state, fail(), ESCALATE_AT_3);
        match run(&mut state, fail(), ESCALATE_AT_3) {
            Settlement::Escalated(err) => {
                assert_eq!(err.consecutive_failure_count(), 3);
                assert_eq!(err.original_cause().map(ToString::to_string).as_deref(), Some("boom"));
            }
            other => panic!("expected escalation, got {other:?}"),
        }
        assert_eq!(state.phase(), SchedulerPhase::Escalated);
        // A late overlapping failure does not raise a second error.
        assert!(matches!(run(&mut state, fail(), ESCALATE_AT_3), Settlement::Halted { failures: 4 }));
    }

    #[test]
    fn no_threshold_counts_forever() {
        let mut state = PollingRuntimeState::new();
        let policy = FailurePolicy {
            max_consecutive_failures: None,
            escalate: true,
        };
        for n in 1..=50 {
            assert!(matches!(run(&mut state, fail(), policy), Settlement::Counted { failures } if failures == n));
        }
    }

    #[test]
    fn completion_after_teardown_is_ignored() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), HALT_AT_3);
        assert_eq!(state.admit(true), TickDecision::Execute);
        state.tear_down();
        assert!(matches!(state.settle(fail(), HALT_AT_3), Settlement::Ignored));
        assert_eq!(state.consecutive_failures(), 1);
        assert!(!state.is_processing());
        assert_eq!(state.admit(true), TickDecision::Inactive);
        assert_eq!(state.phase(), SchedulerPhase::TornDown);
    }

    #[tokio::test]
    async fn arm_is_idempotent_and_clears_halt() {
        let mut state = PollingRuntimeState::new();
        run(&mut state, fail(), FailurePolicy { max_consecutive_failures: Some(1), escalate: true });
        assert_eq!(state.phase(), SchedulerPhase::Escalated);

        assert!(state.arm(Duration::from_millis(10)));
        assert!(!state.arm(Duration::from_millis(10)));
        assert_eq!(state.phase(), SchedulerPhase::Armed);
        assert_eq!(state.consecutive_failures(), 1);

        assert!(state.disarm());
        assert!(!state.disarm());
        assert_eq!(state.phase(), SchedulerPhase::Idle);
    }
}
