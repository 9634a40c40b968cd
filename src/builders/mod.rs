//! Builders that assemble capture sessions from configuration.

pub mod session_builder;

pub use session_builder::{build_capture_session, HttpCaptureSession};
