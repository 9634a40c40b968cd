//! Runtime adapters and the supervised capture session.

pub mod session;
pub mod tokio_spawner;

pub use session::CaptureSession;
pub use tokio_spawner::TokioSpawner;
