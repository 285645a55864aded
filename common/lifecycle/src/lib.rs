//! Coordinated graceful shutdown: component registration, a shared done-signal,
//! bounded-time collection of every component's shutdown outcome, and OS signal
//! trapping. Configuration can be read from the environment with [`ShutdownConfig`].

mod config;
mod coordinator;
mod error;
mod handle;
mod metrics;
mod signals;

pub use config::{EnvMsDuration, ShutdownConfig, SignalList};
pub use coordinator::{
    ShutdownCoordinator, ShutdownCoordinatorBuilder, ShutdownOptions, ShutdownPhase,
    DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT,
};
pub use error::{ComponentError, LifecycleError, ShutdownFailure};
pub use handle::ShutdownSender;
pub use signals::{ParseShutdownSignalError, ShutdownSignal};
pub use tokio_util::sync::CancellationToken;
