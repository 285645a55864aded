use std::sync::Arc;

use crate::poll::PollCheck;
use crate::pulse::PulseCheck;
use crate::push::PushCheck;

/// Capability shared by every readiness check: a name and a current readiness value.
///
/// Implementations must be cheap and non-blocking, `ready` is called on the hot
/// path of every probe request.
pub trait ReadinessCheck: Send + Sync {
    fn name(&self) -> &str;
    fn ready(&self) -> bool;
}

impl<T: ReadinessCheck + ?Sized> ReadinessCheck for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ready(&self) -> bool {
        (**self).ready()
    }
}

/// A check as stored by the registry. Evaluation goes through [`ReadinessCheck`];
/// the variant is only inspected to drive the poll lifecycle.
#[derive(Clone)]
pub(crate) enum RegisteredCheck {
    Poll(PollCheck),
    Push(PushCheck),
    Pulse(PulseCheck),
    Custom(Arc<dyn ReadinessCheck>),
}

impl RegisteredCheck {
    pub(crate) fn as_poll(&self) -> Option<&PollCheck> {
        match self {
            RegisteredCheck::Poll(poll) => Some(poll),
            _ => None,
        }
    }
}

impl ReadinessCheck for RegisteredCheck {
    fn name(&self) -> &str {
        match self {
            RegisteredCheck::Poll(check) => check.name(),
            RegisteredCheck::Push(check) => check.name(),
            RegisteredCheck::Pulse(check) => check.name(),
            RegisteredCheck::Custom(check) => check.name(),
        }
    }

    fn ready(&self) -> bool {
        match self {
            RegisteredCheck::Poll(check) => check.ready(),
            RegisteredCheck::Push(check) => check.ready(),
            RegisteredCheck::Pulse(check) => check.ready(),
            RegisteredCheck::Custom(check) => check.ready(),
        }
    }
}
