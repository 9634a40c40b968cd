//! Build an HTTP-backed capture session from relay configuration.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::core::{NetworkBoundary, SchedulerError, Spawn};
use crate::infra::HttpSubmitter;
use crate::producer::{FrameProducer, FrameSource, PositionSource};
use crate::runtime::CaptureSession;

/// Session posting frames through [`HttpSubmitter`].
pub type HttpCaptureSession<F, P, S> = CaptureSession<FrameProducer<F, P, HttpSubmitter>, S>;

/// Validate `cfg` and launch a capture session for the given device sources.
///
/// When `boundary` is `None` a default boundary redirecting to
/// `cfg.reauth_path` is used.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] if validation fails and
/// [`SchedulerError::Backend`] if the HTTP client cannot be built.
pub fn build_capture_session<F, P, S>(
    cfg: &RelayConfig,
    frames: F,
    positions: P,
    boundary: Option<NetworkBoundary>,
    spawner: S,
) -> Result<HttpCaptureSession<F, P, S>, SchedulerError>
where
    F: FrameSource,
    P: PositionSource,
    S: Spawn,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let submitter = HttpSubmitter::new(cfg)?;
    let producer = FrameProducer::new(frames, positions, submitter);
    let boundary = boundary
        .unwrap_or_else(|| NetworkBoundary::new().with_reauth_path(cfg.reauth_path.clone()));

    CaptureSession::launch(
        cfg.actions_url(),
        cfg.polling.clone(),
        producer,
        Arc::new(boundary),
        spawner,
    )
}
