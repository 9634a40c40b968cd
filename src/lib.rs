//! # Capture Relay
//!
//! A resilient fixed-interval polling engine that captures a frame, tags it
//! with the current position and submits it to a remote endpoint.
//!
//! Transient network failures are tolerated but never accumulate silently:
//! the scheduler counts consecutive failures, halts at a configurable
//! threshold and can escalate a typed error to a supervising boundary that
//! freezes operation until it is explicitly reset.
//!
//! ## Components
//!
//! - **[`PollingScheduler`](core::PollingScheduler)**: fixed-cadence timer,
//!   optional single-flight execution, consecutive-failure counter.
//! - **[`NetworkBoundary`](core::NetworkBoundary)**: intercepts the
//!   [`NetworkError`](core::NetworkError) family and lets everything else
//!   propagate.
//! - **[`FrameProducer`](producer::FrameProducer)**: one capture and
//!   submission per tick, silently skipping when capture or position is
//!   unavailable.
//! - **[`CaptureSession`](runtime::CaptureSession)**: wires the three
//!   together and offers recovery.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use capture_relay::config::PollingConfig;
//! use capture_relay::core::NetworkBoundary;
//! use capture_relay::infra::{ScriptedSubmitter, SharedFrameSource, SharedPositionSource};
//! use capture_relay::producer::{Frame, FrameProducer};
//! use capture_relay::runtime::{CaptureSession, TokioSpawner};
//!
//! let producer = FrameProducer::new(
//!     SharedFrameSource::ready_with(Frame::jpeg(jpeg_bytes)),
//!     SharedPositionSource::at(37.56, 126.97),
//!     ScriptedSubmitter::new(),
//! );
//! let boundary = Arc::new(NetworkBoundary::new().with_on_error(|e| eprintln!("{e}")));
//! let session = CaptureSession::launch(
//!     "capture",
//!     PollingConfig::capture_defaults(),
//!     producer,
//!     boundary,
//!     TokioSpawner::current()?,
//! )?;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders that assemble sessions from configuration.
pub mod builders;
/// Configuration models for polling and submission.
pub mod config;
/// Polling engine: state, scheduler, errors, boundary.
pub mod core;
/// Adapters for capture, position and submission collaborators.
pub mod infra;
/// Work producer and its collaborator traits.
pub mod producer;
/// Runtime adapters and the supervised session.
pub mod runtime;
/// Shared utilities.
pub mod util;
