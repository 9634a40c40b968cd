//! Adapters for the producer's external collaborators.

pub mod http_submitter;
pub mod memory;

pub use http_submitter::HttpSubmitter;
pub use memory::{Reply, ScriptedSubmitter, SharedFrameSource, SharedPositionSource};
