//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use capture_relay::core::{
    Completion, EscalationHook, NetworkError, PollingScheduler, SkipReason, UnitOfWork, WorkResult,
};
use capture_relay::config::PollingConfig;
use capture_relay::runtime::TokioSpawner;

/// Outcome of one scripted execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
    Skip,
}

/// Unit of work replaying a script of outcomes and latencies.
pub struct ScriptedWork {
    steps: Mutex<VecDeque<(Step, Duration)>>,
    otherwise: (Step, Duration),
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedWork {
    pub fn new(otherwise: Step) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            otherwise: (otherwise, Duration::ZERO),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Latency of every execution once the script is exhausted.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.otherwise.1 = latency;
        self
    }

    pub fn then(self, step: Step, latency: Duration) -> Self {
        self.steps.lock().unwrap().push_back((step, latency));
        self
    }

    pub fn steps(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps
            .lock()
            .unwrap()
            .extend(steps.into_iter().map(|s| (s, Duration::ZERO)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct Active<'a>(&'a AtomicUsize);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UnitOfWork for ScriptedWork {
    async fn run(&self) -> WorkResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _active = Active(&self.active);

        let (step, latency) = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.otherwise);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match step {
            Step::Succeed => Ok(Completion::Submitted),
            Step::Skip => Ok(Completion::Skipped(SkipReason::CaptureNotReady)),
            Step::Fail => Err(anyhow::Error::new(NetworkError::timeout(Duration::from_millis(3000)))),
        }
    }
}

/// Escalation hook that records every delivered error.
pub fn recording_hook() -> (EscalationHook, Arc<Mutex<Vec<NetworkError>>>) {
    let seen = Arc::new(Mutex::new(Vec::<NetworkError>::new()));
    let sink = Arc::clone(&seen);
    let hook: EscalationHook = Arc::new(move |err: NetworkError| sink.lock().unwrap().push(err));
    (hook, seen)
}

pub fn launch(
    config: PollingConfig,
    work: &Arc<ScriptedWork>,
    hook: Option<EscalationHook>,
) -> PollingScheduler {
    let spawner = TokioSpawner::current().expect("tokio runtime");
    PollingScheduler::launch("test", config, Arc::clone(work), hook, &spawner)
        .expect("valid config")
}

pub fn every(ms: u64) -> PollingConfig {
    PollingConfig::new().with_interval(Duration::from_millis(ms))
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
