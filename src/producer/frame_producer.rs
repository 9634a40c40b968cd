//! Unit of work that captures a frame, tags it with the current position and submits it.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::capture::{Acknowledgment, FrameSource, PositionSource, Submission, Submitter};
use crate::core::{Completion, SkipReason, UnitOfWork, WorkResult};

/// Frame capture and submission, one attempt per execution.
///
/// Preconditions are checked in order: capture readiness, position fix,
/// non-empty snapshot. An unmet precondition ends the execution as a silent
/// skip without contacting the submitter. Submitter errors are failures.
pub struct FrameProducer<F, P, S> {
    frames: F,
    positions: P,
    submitter: S,
    acks: watch::Sender<Option<Acknowledgment>>,
}

impl<F, P, S> FrameProducer<F, P, S>
where
    F: FrameSource,
    P: PositionSource,
    S: Submitter,
{
    /// Assemble a producer from its collaborators.
    pub fn new(frames: F, positions: P, submitter: S) -> Self {
        let (acks, _) = watch::channel(None);
        Self {
            frames,
            positions,
            submitter,
            acks,
        }
    }

    /// Receiver of the latest acknowledgment.
    #[must_use]
    pub fn acknowledgments(&self) -> watch::Receiver<Option<Acknowledgment>> {
        self.acks.subscribe()
    }
}

#[async_trait]
impl<F, P, S> UnitOfWork for FrameProducer<F, P, S>
where
    F: FrameSource,
    P: PositionSource,
    S: Submitter,
{
    async fn run(&self) -> WorkResult {
        if !self.frames.is_ready() {
            return Ok(Completion::Skipped(SkipReason::CaptureNotReady));
        }
        let Some(fix) = self.positions.current_fix() else {
            return Ok(Completion::Skipped(SkipReason::PositionUnavailable));
        };
        let Some(frame) = self.frames.snapshot().filter(|f| !f.is_empty()) else {
            return Ok(Completion::Skipped(SkipReason::EmptyFrame));
        };

        let submission = Submission::new(frame, fix);
        debug!(
            file = %submission.file_name,
            bytes = submission.frame.data.len(),
            latitude = fix.latitude,
            longitude = fix.longitude,
            "submitting frame"
        );
        let ack = self.submitter.submit(submission).await?;
        debug!(status = ack.status, "frame acknowledged");
        self.acks.send_replace(Some(ack));
        Ok(Completion::Submitted)
    }
}
