//! Configuration models for polling and submission.

pub mod polling;
pub mod relay;

pub use polling::PollingConfig;
pub use relay::RelayConfig;
