//! Polling engine: runtime state, scheduler driver, error taxonomy and the
//! network boundary.

pub mod boundary;
pub mod error;
pub mod scheduler;
pub mod spawn;
pub mod state;
pub mod work;

pub use boundary::{
    BoundaryState, DefaultFallback, ErrorHook, Fallback, FallbackView, NetworkBoundary, Recovery,
    RecoveryAction,
};
pub use error::{AppResult, Cause, Fault, NetworkError, NetworkErrorKind, SchedulerError};
pub use scheduler::{EscalationHook, PollingScheduler};
pub use spawn::Spawn;
pub use state::{
    FailurePolicy, PollingRuntimeState, PollingStatus, SchedulerPhase, Settlement, TickDecision,
};
pub use work::{Completion, SkipReason, UnitOfWork, WorkFn, WorkResult};
