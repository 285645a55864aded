//! Shutdown coordinator: component registration, done-signal, bounded collection of shutdown results.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ComponentError, LifecycleError, ShutdownFailure};
use crate::handle::{Completion, ShutdownSender};
use crate::metrics;
use crate::signals::{self, ShutdownSignal};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for creating a [`ShutdownCoordinator`]. Zero durations and an empty
/// signal list fall back to the defaults.
#[derive(Clone, Debug)]
pub struct ShutdownOptions {
    /// Deadline for every component to report completion once shutdown begins.
    pub timeout: Duration,
    /// Delay between two polls of the completion signals.
    pub poll_interval: Duration,
    /// Signals awaited by [`ShutdownCoordinator::wait_for_shutdown`].
    pub signals: Vec<ShutdownSignal>,
    /// Install OS signal handlers in `wait_for_shutdown` (default: true). When disabled,
    /// only cancellation of the done-signal ends the wait.
    pub trap_signals: bool,
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            signals: ShutdownSignal::DEFAULT.to_vec(),
            trap_signals: true,
        }
    }
}

impl ShutdownOptions {
    fn normalized(mut self) -> Self {
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.signals.is_empty() {
            self.signals = ShutdownSignal::DEFAULT.to_vec();
        }
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Components are running, shutdown has not been requested.
    Idle,
    /// The done-signal fired; components are cleaning up.
    ShuttingDown,
    /// Shutdown results were collected; the coordinator cannot be used again.
    Disposed,
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    Open,
    Collecting,
    Disposed,
}

#[derive(Default)]
struct Components {
    // receivers are taken by the collection loop, names stay for duplicate detection
    pending: HashMap<String, Option<oneshot::Receiver<Completion>>>,
    stage: Stage,
}

/// Coordinates the graceful shutdown of independently running components.
///
/// Each component registers under a unique name and watches the shared done-signal
/// ([`done_token`](ShutdownCoordinator::done_token)). When shutdown is triggered, the
/// signal fires and the coordinator polls every component's completion signal until all
/// of them reported or the timeout elapsed. Components that failed or did not report in
/// time are returned in a [`ShutdownFailure`].
///
/// Components are not ordered: they all start cleaning up as soon as the done-signal fires.
/// A component that misses the deadline is reported as timed out but its task is not
/// aborted.
pub struct ShutdownCoordinator {
    options: ShutdownOptions,
    done: CancellationToken,
    components: RwLock<Components>,
    // held by the winning caller for the whole collection loop
    collecting: Mutex<()>,
    waiting: Mutex<()>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(ShutdownOptions::default())
    }
}

impl ShutdownCoordinator {
    pub fn new(options: ShutdownOptions) -> Self {
        Self::with_parent(options, &CancellationToken::new())
    }

    /// Create a coordinator whose done-signal is a child of `parent`: cancelling the
    /// parent starts the shutdown of every component.
    pub fn with_parent(options: ShutdownOptions, parent: &CancellationToken) -> Self {
        Self {
            options: options.normalized(),
            done: parent.child_token(),
            components: Default::default(),
            collecting: Mutex::new(()),
            waiting: Mutex::new(()),
        }
    }

    pub fn builder() -> ShutdownCoordinatorBuilder {
        ShutdownCoordinatorBuilder::default()
    }

    pub fn options(&self) -> &ShutdownOptions {
        &self.options
    }

    /// The done-signal. Cancelled once shutdown begins; use `cancelled()` in
    /// `tokio::select!` to break out of work loops.
    pub fn done_token(&self) -> CancellationToken {
        self.done.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Future that resolves when shutdown begins; pass to `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.done.clone();
        async move {
            token.cancelled().await;
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        match self.read().stage {
            Stage::Disposed => ShutdownPhase::Disposed,
            Stage::Collecting => ShutdownPhase::ShuttingDown,
            Stage::Open if self.done.is_cancelled() => ShutdownPhase::ShuttingDown,
            Stage::Open => ShutdownPhase::Idle,
        }
    }

    /// Names of all registered components, sorted.
    pub fn registered_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().pending.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a component and return its completion signal. The component is expected
    /// to watch [`done_token`](ShutdownCoordinator::done_token) and report through the
    /// sender once its cleanup is over.
    pub fn register_component(&self, name: &str) -> Result<ShutdownSender, LifecycleError> {
        let mut components = self.write();
        if components.stage != Stage::Open {
            return Err(LifecycleError::AlreadyShutdown);
        }
        if components.pending.contains_key(name) {
            return Err(LifecycleError::AlreadyRegistered(name.to_string()));
        }

        let (sender, receiver) = ShutdownSender::new(name.to_string());
        drop(components.pending.insert(name.to_string(), Some(receiver)));
        debug!(component = %name, "Lifecycle: component registered");

        Ok(sender)
    }

    /// Register a component whose cleanup is `shutdown_fn`. It is spawned right away,
    /// waits for the done-signal, then runs once; its result (or its panic) is reported
    /// as the component's outcome.
    pub fn register_component_with_fn<F, Fut>(
        &self,
        name: &str,
        shutdown_fn: F,
    ) -> Result<(), LifecycleError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let sender = self.register_component(name)?;
        let done = self.done.clone();

        tokio::spawn(async move {
            done.cancelled().await;

            let cleanup = async move { shutdown_fn().await };
            let result = match AssertUnwindSafe(cleanup).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("shutdown function panicked")),
            };
            sender.send(result);
        });

        Ok(())
    }

    /// Fire the done-signal and wait for every component to report, at most for the
    /// configured timeout.
    ///
    /// Returns `Ok` if all components shut down cleanly in time, a
    /// [`LifecycleError::Shutdown`] naming the failed or timed out components otherwise,
    /// and [`LifecycleError::AlreadyShutdown`] if shutdown already ran. A call made while
    /// another one is collecting waits for that collection to end before returning
    /// `AlreadyShutdown`.
    ///
    /// Dropping the returned future mid-collection disposes the coordinator.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        self.finalize("manual").await
    }

    /// Wait for one of the configured OS signals, or for the done-signal to be cancelled
    /// by other means, then run [`shutdown`](ShutdownCoordinator::shutdown).
    ///
    /// Only one caller may wait at a time, others get [`LifecycleError::AlreadyWaiting`].
    /// A concurrent direct `shutdown()` is not excluded: whichever starts collecting second
    /// waits for the first collection to end, then gets [`LifecycleError::AlreadyShutdown`].
    pub async fn wait_for_shutdown(&self) -> Result<(), LifecycleError> {
        let Ok(_waiting) = self.waiting.try_lock() else {
            return Err(LifecycleError::AlreadyWaiting);
        };
        if self.read().stage != Stage::Open {
            drop(self.collecting.lock().await);
            return Err(LifecycleError::AlreadyShutdown);
        }

        let trigger = if self.options.trap_signals {
            tokio::select! {
                received = signals::wait_for_shutdown_signal(&self.options.signals) => {
                    received?;
                    "signal"
                }
                _ = self.done.cancelled() => "cancelled",
            }
        } else {
            self.done.cancelled().await;
            "cancelled"
        };

        self.finalize(trigger).await
    }

    async fn finalize(&self, trigger: &str) -> Result<(), LifecycleError> {
        let _collecting = self.collecting.lock().await;
        let outstanding: Vec<(String, oneshot::Receiver<Completion>)> = {
            let mut components = self.write();
            self.done.cancel();
            if components.stage != Stage::Open {
                return Err(LifecycleError::AlreadyShutdown);
            }
            components.stage = Stage::Collecting;
            components
                .pending
                .iter_mut()
                .filter_map(|(name, rx)| rx.take().map(|rx| (name.clone(), rx)))
                .collect()
        };
        // dropped before `_collecting`: waiting callers always observe the disposed stage
        let _disposal = Disposal(&self.components);

        metrics::emit_shutdown_initiated(trigger);
        info!(
            trigger_reason = trigger,
            components = outstanding.len(),
            "Lifecycle: shutdown initiated"
        );

        self.collect(outstanding).await
    }

    /// Polls the completion signals until all are in or the deadline elapsed.
    async fn collect(
        &self,
        mut outstanding: Vec<(String, oneshot::Receiver<Completion>)>,
    ) -> Result<(), LifecycleError> {
        let shutdown_clock = Instant::now();
        let deadline = shutdown_clock + self.options.timeout;
        let mut component_errors = HashMap::new();

        loop {
            if Instant::now() >= deadline {
                for (tag, _) in outstanding {
                    metrics::emit_component_shutdown_result(&tag, "timeout");
                    warn!(
                        component = %tag,
                        duration_secs = self.options.timeout.as_secs_f64(),
                        result = "timeout",
                        "Lifecycle: component timed out during graceful shutdown"
                    );
                    drop(component_errors.insert(tag, ComponentError::Timeout));
                }
                return finish(shutdown_clock, component_errors);
            }

            outstanding.retain_mut(|(tag, rx)| {
                let outcome = match rx.try_recv() {
                    Err(TryRecvError::Empty) => return true,
                    // a dropped sender counts as completion
                    Ok(Ok(())) | Err(TryRecvError::Closed) => None,
                    Ok(Err(err)) => Some(err),
                };

                let elapsed = shutdown_clock.elapsed().as_secs_f64();
                match outcome {
                    None => {
                        metrics::emit_component_shutdown_result(tag, "completed");
                        info!(
                            component = %tag,
                            duration_secs = elapsed,
                            result = "completed",
                            "Lifecycle: component completed shutdown"
                        );
                    }
                    Some(err) => {
                        metrics::emit_component_shutdown_result(tag, "failed");
                        warn!(
                            component = %tag,
                            duration_secs = elapsed,
                            result = "failed",
                            "Lifecycle: component failed to shut down: {err:#}"
                        );
                        drop(component_errors.insert(tag.clone(), ComponentError::Failed(err)));
                    }
                }
                false
            });

            if outstanding.is_empty() {
                return finish(shutdown_clock, component_errors);
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Components> {
        self.components.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Components> {
        self.components
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the coordinator disposed once collection ends, even if the collecting
/// future is dropped before completion.
struct Disposal<'a>(&'a RwLock<Components>);

impl Drop for Disposal<'_> {
    fn drop(&mut self) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).stage = Stage::Disposed;
    }
}

fn finish(
    shutdown_clock: Instant,
    component_errors: HashMap<String, ComponentError>,
) -> Result<(), LifecycleError> {
    let total = shutdown_clock.elapsed().as_secs_f64();
    let clean = component_errors.is_empty();
    metrics::emit_shutdown_completed(clean, total);

    if clean {
        info!(
            clean = true,
            total_duration_secs = total,
            "Lifecycle: shutdown complete"
        );
        return Ok(());
    }

    warn!(
        clean = false,
        total_duration_secs = total,
        failed = component_errors.len(),
        "Lifecycle: shutdown complete with failures"
    );
    Err(ShutdownFailure { component_errors }.into())
}

/// Builder for [`ShutdownCoordinator`].
#[derive(Default)]
pub struct ShutdownCoordinatorBuilder {
    options: ShutdownOptions,
    parent: Option<CancellationToken>,
}

impl ShutdownCoordinatorBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.options.poll_interval = poll_interval;
        self
    }

    pub fn with_signals(mut self, signals: impl IntoIterator<Item = ShutdownSignal>) -> Self {
        self.options.signals = signals.into_iter().collect();
        self
    }

    pub fn with_trap_signals(mut self, trap_signals: bool) -> Self {
        self.options.trap_signals = trap_signals;
        self
    }

    /// Shutdown starts when `parent` is cancelled.
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> ShutdownCoordinator {
        match self.parent {
            Some(parent) => ShutdownCoordinator::with_parent(self.options, &parent),
            None => ShutdownCoordinator::new(self.options),
        }
    }
}
