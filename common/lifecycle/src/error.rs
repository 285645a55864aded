//! Lifecycle error types returned by the shutdown coordinator.

use std::collections::HashMap;

use thiserror::Error;

/// Errors returned by [`ShutdownCoordinator`](crate::ShutdownCoordinator).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A component with the same name is already registered.
    #[error("component '{0}' was already registered")]
    AlreadyRegistered(String),

    /// The coordinator already ran its shutdown and cannot be used again.
    #[error("shutdown has already occurred")]
    AlreadyShutdown,

    /// Another task is already blocked in [`wait_for_shutdown`](crate::ShutdownCoordinator::wait_for_shutdown).
    #[error("shutdown is already being awaited")]
    AlreadyWaiting,

    /// One or more components failed or timed out during shutdown.
    #[error(transparent)]
    Shutdown(#[from] ShutdownFailure),

    /// The OS signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl LifecycleError {
    /// Per-component outcome, if this error comes from a completed shutdown.
    pub fn shutdown_failure(&self) -> Option<&ShutdownFailure> {
        match self {
            LifecycleError::Shutdown(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why a single component did not shut down cleanly.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The shutdown deadline elapsed before the component reported completion.
    #[error("shutdown took too long to complete")]
    Timeout,

    /// The component reported an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),
}

impl ComponentError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ComponentError::Timeout)
    }
}

/// Aggregate of every component that failed or timed out, keyed by component name.
/// Components that shut down cleanly are absent.
#[derive(Debug, Error)]
#[error("error while shutting down ({})", describe(.component_errors))]
pub struct ShutdownFailure {
    pub component_errors: HashMap<String, ComponentError>,
}

impl ShutdownFailure {
    /// True if every recorded cause is a timeout, i.e. shutdown was only too slow.
    pub fn is_timeout_err(&self) -> bool {
        self.component_errors.values().all(ComponentError::is_timeout)
    }

    pub fn get(&self, component: &str) -> Option<&ComponentError> {
        self.component_errors.get(component)
    }
}

fn describe(errors: &HashMap<String, ComponentError>) -> String {
    let mut entries: Vec<String> = errors
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect();
    entries.sort();
    entries.join(", ")
}
