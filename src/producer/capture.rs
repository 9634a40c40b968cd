//! External collaborators of the frame producer and the data they exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::NetworkError;
use crate::util::clock::now_ms;

/// MIME type of captured frames.
pub const JPEG: &str = "image/jpeg";

/// One encoded still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// MIME type of `data`.
    pub content_type: String,
    /// Capture time in milliseconds since the Unix epoch.
    pub captured_at_ms: u128,
}

impl Frame {
    /// JPEG frame captured now.
    #[must_use]
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            content_type: JPEG.to_string(),
            captured_at_ms: now_ms(),
        }
    }

    /// Whether the frame carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Live capture device.
///
/// Both methods are polled synchronously at tick time and must not block.
pub trait FrameSource: Send + Sync + 'static {
    /// Whether a current frame is available.
    fn is_ready(&self) -> bool;
    /// Encode the current frame, or `None` if nothing could be captured.
    fn snapshot(&self) -> Option<Frame>;
}

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// Source of the most recent position fix.
pub trait PositionSource: Send + Sync + 'static {
    /// Latest fix, or `None` if none is available yet.
    fn current_fix(&self) -> Option<PositionFix>;
}

/// One unit of work bound for the remote endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The captured image.
    pub frame: Frame,
    /// Where it was captured.
    pub fix: PositionFix,
    /// File name sent with the image part.
    pub file_name: String,
}

impl Submission {
    /// Pair a frame with a fix, naming the file after the capture time.
    #[must_use]
    pub fn new(frame: Frame, fix: PositionFix) -> Self {
        let file_name = format!("snapshot_{}.jpg", frame.captured_at_ms);
        Self {
            frame,
            fix,
            file_name,
        }
    }
}

/// Response of an accepted submission. The body is passed through uninterpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `Null` when the body was empty.
    pub body: serde_json::Value,
}

/// Delivers submissions to the remote endpoint.
///
/// Implementations bound every attempt by their own deadline and report
/// expiry as [`NetworkError::timeout`].
#[async_trait]
pub trait Submitter: Send + Sync + 'static {
    /// Submit once.
    async fn submit(&self, submission: Submission) -> Result<Acknowledgment, NetworkError>;
}

#[async_trait]
impl<S> Submitter for Arc<S>
where
    S: Submitter + ?Sized,
{
    async fn submit(&self, submission: Submission) -> Result<Acknowledgment, NetworkError> {
        (**self).submit(submission).await
    }
}

impl<F> FrameSource for Arc<F>
where
    F: FrameSource + ?Sized,
{
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn snapshot(&self) -> Option<Frame> {
        (**self).snapshot()
    }
}

impl<P> PositionSource for Arc<P>
where
    P: PositionSource + ?Sized,
{
    fn current_fix(&self) -> Option<PositionFix> {
        (**self).current_fix()
    }
}
