//! Runtime abstraction used to launch scheduler drivers.

use std::future::Future;

/// Abstraction for spawning a driver future on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
