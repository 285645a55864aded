//! Completion signal handed to registered components.

use tokio::sync::oneshot;
use tracing::debug;

pub(crate) type Completion = anyhow::Result<()>;

/// Single-use completion signal returned by
/// [`register_component`](crate::ShutdownCoordinator::register_component).
///
/// Once the component observes the done-signal and finishes its cleanup, it reports
/// the outcome by consuming the sender with [`done`](ShutdownSender::done),
/// [`fail`](ShutdownSender::fail) or [`send`](ShutdownSender::send). Dropping the
/// sender without reporting counts as a successful shutdown.
///
/// Reporting never blocks, even after the coordinator gave up waiting.
#[derive(Debug)]
pub struct ShutdownSender {
    component: String,
    tx: oneshot::Sender<Completion>,
}

impl ShutdownSender {
    pub(crate) fn new(component: String) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (Self { component, tx }, rx)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Report the outcome of the component's shutdown.
    pub fn send(self, result: anyhow::Result<()>) {
        if self.tx.send(result).is_err() {
            debug!(component = %self.component, "Lifecycle: shutdown result reported after collection ended");
        }
    }

    /// Report a clean shutdown.
    pub fn done(self) {
        self.send(Ok(()))
    }

    /// Report a failed shutdown.
    pub fn fail(self, err: impl Into<anyhow::Error>) {
        self.send(Err(err.into()))
    }
}
