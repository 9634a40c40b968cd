//! Work producer: turns live capture and position state into one submission per tick.

pub mod capture;
pub mod frame_producer;

pub use capture::{
    Acknowledgment, Frame, FrameSource, PositionFix, PositionSource, Submission, Submitter,
};
pub use frame_producer::FrameProducer;
