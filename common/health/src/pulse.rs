use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::check::ReadinessCheck;

/// Sentinel: no pulse recorded yet.
const NO_PULSE: u64 = 0;

/// Heartbeat-based readiness check. Each [`record_pulse`](PulseCheck::record_pulse)
/// marks the component ready until `expiration` has elapsed; readiness decays on
/// its own, nothing runs in the background.
///
/// A zero expiration means the check is always expiring: it only reads as ready
/// within the same clock tick as the pulse.
#[derive(Clone, Debug)]
pub struct PulseCheck {
    name: Arc<str>,
    expiration: Duration,
    origin: Instant,
    // nanoseconds since `origin`, offset by one so that NO_PULSE stays free
    last_pulse: Arc<AtomicU64>,
}

impl PulseCheck {
    pub fn new(name: impl Into<String>, expiration: Duration) -> Self {
        Self {
            name: Arc::from(name.into()),
            expiration,
            origin: Instant::now(),
            last_pulse: Arc::new(AtomicU64::new(NO_PULSE)),
        }
    }

    /// Records a heartbeat at the current instant, replacing any previous one.
    pub fn record_pulse(&self) {
        let since_origin = Instant::now().saturating_duration_since(self.origin);
        let encoded = u64::try_from(since_origin.as_nanos())
            .unwrap_or(u64::MAX - 1)
            .saturating_add(1);
        self.last_pulse.store(encoded, Ordering::SeqCst);
    }

    /// Instant of the most recent pulse, if any.
    pub fn last_pulse(&self) -> Option<Instant> {
        match self.last_pulse.load(Ordering::SeqCst) {
            NO_PULSE => None,
            encoded => Some(self.origin + Duration::from_nanos(encoded - 1)),
        }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }
}

impl ReadinessCheck for PulseCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn ready(&self) -> bool {
        self.last_pulse()
            .is_some_and(|last| Instant::now().saturating_duration_since(last) <= self.expiration)
    }
}
