use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use crate::check::{ReadinessCheck, RegisteredCheck};
use crate::poll::PollCheck;
use crate::pulse::PulseCheck;
use crate::push::PushCheck;

#[derive(Default, Debug)]
pub struct ReadinessStatus {
    /// The overall status: true if all components are ready
    pub ready: bool,
    /// Current readiness of each registered component, for display
    pub components: HashMap<String, bool>,
}

impl IntoResponse for ReadinessStatus {
    /// Computes the axum status code based on the overall readiness,
    /// and prints each component status in the body for debugging.
    fn into_response(self) -> Response {
        let body = format!("{self:?}");
        match self.ready {
            true => (StatusCode::OK, body),
            false => (StatusCode::SERVICE_UNAVAILABLE, body),
        }
        .into_response()
    }
}

/// Aggregates the readiness of an arbitrary number of components.
///
/// The registry is append-only and keeps registration order. Names are not
/// deduplicated: two checks may share a name, in which case [`explain`](ReadinessRegistry::explain)
/// only keeps the value of the one registered last.
#[derive(Clone)]
pub struct ReadinessRegistry {
    name: String,
    checks: Arc<RwLock<Vec<RegisteredCheck>>>,
}

impl ReadinessRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            checks: Default::default(),
        }
    }

    /// Registers a check that runs `probe` every `interval` once polling is started
    /// with [`start_polling`](ReadinessRegistry::start_polling).
    pub fn register_poll_component<F>(&self, name: &str, probe: F, interval: Duration) -> PollCheck
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let check = PollCheck::new(name, probe, interval);
        self.append(RegisteredCheck::Poll(check.clone()));
        check
    }

    /// Registers a check whose value is set through the returned handle.
    pub fn register_push_component(&self, name: &str) -> PushCheck {
        let check = PushCheck::new(name);
        self.append(RegisteredCheck::Push(check.clone()));
        check
    }

    /// Registers a check that stays ready for `expiration` after each recorded pulse.
    pub fn register_pulse_component(&self, name: &str, expiration: Duration) -> PulseCheck {
        let check = PulseCheck::new(name, expiration);
        self.append(RegisteredCheck::Pulse(check.clone()));
        check
    }

    /// Registers any custom check. [`explain`](ReadinessRegistry::explain) reports it
    /// under its own [`ReadinessCheck::name`]; `name` only labels the registration log.
    pub fn register_component<C>(&self, name: &str, check: C)
    where
        C: ReadinessCheck + 'static,
    {
        debug!(registry = %self.name, registration = %name, "Readiness: custom check registered");
        self.append(RegisteredCheck::Custom(Arc::new(check)));
    }

    fn append(&self, check: RegisteredCheck) {
        debug!(registry = %self.name, component = %check.name(), "Readiness: component registered");
        self.checks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(check);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RegisteredCheck>> {
        self.checks.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the loop of every registered poll check on its own task. Must be
    /// called from within a tokio runtime. Does not wait for the first probe.
    pub fn start_polling(&self) {
        let polls: Vec<PollCheck> = self
            .read()
            .iter()
            .filter_map(|check| check.as_poll().cloned())
            .collect();
        info!(registry = %self.name, count = polls.len(), "Readiness: starting poll checks");
        for poll in polls {
            tokio::spawn(async move { poll.start().await });
        }
    }

    /// Stops every registered poll check. Does not wait for the loops to exit.
    pub fn stop_polling(&self) {
        for poll in self.read().iter().filter_map(RegisteredCheck::as_poll) {
            poll.stop();
        }
        info!(registry = %self.name, "Readiness: poll checks stopped");
    }

    /// True if every registered check is ready. Stops at the first check that is not.
    pub fn ready(&self) -> bool {
        self.read().iter().all(|check| check.ready())
    }

    /// Readiness of every registered check, keyed by name.
    pub fn explain(&self) -> HashMap<String, bool> {
        let checks = self.read();
        let mut explanation = HashMap::with_capacity(checks.len());
        for check in checks.iter() {
            _ = explanation.insert(check.name().to_owned(), check.ready());
        }
        explanation
    }

    /// Full snapshot, can be used as an axum handler.
    pub fn status(&self) -> ReadinessStatus {
        let checks = self.read();
        let mut status = ReadinessStatus {
            ready: true,
            components: HashMap::with_capacity(checks.len()),
        };
        for check in checks.iter() {
            let ready = check.ready();
            status.ready &= ready;
            _ = status.components.insert(check.name().to_owned(), ready);
        }
        drop(checks);

        match status.ready {
            true => debug!("{} readiness check ok", self.name),
            false => warn!("{} readiness check failed: {:?}", self.name, status.components),
        }
        status
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
