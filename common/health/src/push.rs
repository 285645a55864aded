use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::check::ReadinessCheck;

/// Readiness check driven by manual input: the component calls
/// [`set_ready`](PushCheck::set_ready) whenever its state changes.
#[derive(Clone, Debug)]
pub struct PushCheck {
    name: Arc<str>,
    ready: Arc<AtomicBool>,
}

impl PushCheck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl ReadinessCheck for PushCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
