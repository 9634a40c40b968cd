//! In-memory collaborators for development and testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::core::NetworkError;
use crate::producer::{Acknowledgment, Frame, FrameSource, PositionFix, PositionSource, Submission, Submitter};
use crate::util::clock::now_ms;

/// Frame source backed by a settable frame.
#[derive(Debug, Default)]
pub struct SharedFrameSource {
    ready: Mutex<bool>,
    frame: Mutex<Option<Frame>>,
}

impl SharedFrameSource {
    /// Source that is not ready and holds no frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ready source that returns `frame` on every snapshot.
    pub fn ready_with(frame: Frame) -> Self {
        Self {
            ready: Mutex::new(true),
            frame: Mutex::new(Some(frame)),
        }
    }

    /// Set readiness.
    pub fn set_ready(&self, ready: bool) {
        *self.ready.lock() = ready;
    }

    /// Replace the current frame.
    pub fn set_frame(&self, frame: Option<Frame>) {
        *self.frame.lock() = frame;
    }
}

impl FrameSource for SharedFrameSource {
    fn is_ready(&self) -> bool {
        *self.ready.lock()
    }

    fn snapshot(&self) -> Option<Frame> {
        self.frame.lock().as_ref().map(|frame| Frame {
            captured_at_ms: now_ms(),
            ..frame.clone()
        })
    }
}

/// Position source backed by a settable fix.
#[derive(Debug, Default)]
pub struct SharedPositionSource {
    fix: Mutex<Option<PositionFix>>,
}

impl SharedPositionSource {
    /// Source without a fix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source reporting `latitude`/`longitude`.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            fix: Mutex::new(Some(PositionFix { latitude, longitude })),
        }
    }

    /// Replace the current fix.
    pub fn set(&self, fix: Option<PositionFix>) {
        *self.fix.lock() = fix;
    }
}

impl PositionSource for SharedPositionSource {
    fn current_fix(&self) -> Option<PositionFix> {
        *self.fix.lock()
    }
}

/// Outcome a [`ScriptedSubmitter`] produces for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// 200 with a small JSON body.
    Accept,
    /// Non-2xx status, reported as a transport error.
    Reject(u16),
    /// Connection failure.
    Unreachable,
    /// Wait for the deadline, then report a timeout.
    Timeout(Duration),
}

#[derive(Debug)]
struct Script {
    replies: VecDeque<Reply>,
    otherwise: Reply,
    submissions: Vec<Submission>,
    active: usize,
    peak: usize,
}

/// Submitter that replays a script of outcomes and records every call.
#[derive(Debug)]
pub struct ScriptedSubmitter {
    script: Mutex<Script>,
    latency: Duration,
}

impl Default for ScriptedSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSubmitter {
    /// Submitter that accepts everything immediately.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                replies: VecDeque::new(),
                otherwise: Reply::Accept,
                submissions: Vec::new(),
                active: 0,
                peak: 0,
            }),
            latency: Duration::ZERO,
        }
    }

    /// Replies consumed in order, one per call.
    #[must_use]
    pub fn with_script(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script.lock().replies.extend(replies);
        self
    }

    /// Reply used once the script is exhausted.
    #[must_use]
    pub fn otherwise(self, reply: Reply) -> Self {
        self.script.lock().otherwise = reply;
        self
    }

    /// Delay applied before every reply.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append replies to the script.
    pub fn push(&self, replies: impl IntoIterator<Item = Reply>) {
        self.script.lock().replies.extend(replies);
    }

    /// Calls received so far.
    pub fn calls(&self) -> usize {
        self.script.lock().submissions.len()
    }

    /// Every submission received, in call order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.script.lock().submissions.clone()
    }

    /// Calls currently in progress.
    pub fn active(&self) -> usize {
        self.script.lock().active
    }

    /// Highest number of calls ever in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.script.lock().peak
    }
}

struct ActiveCall<'a>(&'a Mutex<Script>);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        let mut script = self.0.lock();
        script.active = script.active.saturating_sub(1);
    }
}

#[async_trait]
impl Submitter for ScriptedSubmitter {
    async fn submit(&self, submission: Submission) -> Result<Acknowledgment, NetworkError> {
        let reply = {
            let mut script = self.script.lock();
            script.submissions.push(submission);
            script.active += 1;
            script.peak = script.peak.max(script.active);
            script.replies.pop_front().unwrap_or(script.otherwise)
        };
        let _active = ActiveCall(&self.script);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            Reply::Accept => Ok(Acknowledgment {
                status: 200,
                body: json!({ "accepted": true }),
            }),
            Reply::Reject(status) => Err(NetworkError::transport(format!(
                "server responded with status {status}"
            ))),
            Reply::Unreachable => Err(NetworkError::transport("connection refused")),
            Reply::Timeout(deadline) => {
                tokio::time::sleep(deadline).await;
                Err(NetworkError::timeout(deadline))
            }
        }
    }
}
