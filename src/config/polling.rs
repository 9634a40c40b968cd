//! Polling scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tick period used when none is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Consecutive failures tolerated by [`PollingConfig::capture_defaults`].
pub const CAPTURE_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Scheduler configuration, fixed for the lifetime of one scheduler instance.
///
/// `enabled` and the interval may still be changed at runtime through the
/// scheduler handle, which restarts the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Tick period in milliseconds; must be greater than 0.
    pub interval_ms: u64,
    /// Trigger one extra execution when the timer is armed.
    pub run_immediately: bool,
    /// Arm the timer as soon as the scheduler is created.
    pub enabled: bool,
    /// Drop ticks while an execution is still in flight.
    pub wait_for_previous: bool,
    /// Consecutive failures that halt the timer; `None` counts without halting.
    pub max_consecutive_failures: Option<u32>,
    /// Raise a consecutive-failure error when the threshold halts the timer.
    pub escalate_on_max_failures: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            run_immediately: false,
            enabled: true,
            wait_for_previous: false,
            max_consecutive_failures: None,
            escalate_on_max_failures: false,
        }
    }
}

impl PollingConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference configuration for frame capture: one tick per second,
    /// single-flight, escalate after five consecutive failures.
    #[must_use]
    pub fn capture_defaults() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            run_immediately: false,
            enabled: true,
            wait_for_previous: true,
            max_consecutive_failures: Some(CAPTURE_MAX_CONSECUTIVE_FAILURES),
            escalate_on_max_failures: true,
        }
    }

    /// Set the tick period.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set whether `start` also runs once immediately.
    #[must_use]
    pub const fn with_run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    /// Set whether the timer is armed on creation.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the single-flight policy.
    #[must_use]
    pub const fn with_wait_for_previous(mut self, wait_for_previous: bool) -> Self {
        self.wait_for_previous = wait_for_previous;
        self
    }

    /// Set (or clear) the consecutive-failure threshold.
    #[must_use]
    pub const fn with_max_consecutive_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Set whether reaching the threshold escalates.
    #[must_use]
    pub const fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate_on_max_failures = escalate;
        self
    }

    /// Tick period as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("interval_ms must be greater than 0".into());
        }
        if self.escalate_on_max_failures && self.max_consecutive_failures.is_none() {
            tracing::debug!("escalate_on_max_failures has no effect without max_consecutive_failures");
        }
        Ok(())
    }

    /// Parse polling configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
