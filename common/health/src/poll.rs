//! Self-polling readiness check.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::check::ReadinessCheck;

type Probe = dyn Fn() -> bool + Send + Sync;

/// Readiness check that periodically runs a probe and caches its latest result.
///
/// Cloning the check is cheap: every clone shares the same state, so the handle
/// returned at registration can be used to stop the loop started by the registry.
#[derive(Clone)]
pub struct PollCheck {
    inner: Arc<PollInner>,
}

struct PollInner {
    name: String,
    interval: Duration,
    probe: Box<Probe>,
    ready: AtomicBool,
    active: AtomicBool,
    // bumped by `stop`, a loop exits once it no longer matches the value it started with
    generation: AtomicU64,
}

impl PollCheck {
    pub fn new<F>(name: impl Into<String>, probe: F, interval: Duration) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PollInner {
                name: name.into(),
                interval,
                probe: Box::new(probe),
                ready: AtomicBool::new(false),
                active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Runs the polling loop until [`stop`](PollCheck::stop) is called.
    ///
    /// The probe is invoked immediately, then once per interval. The stop request is
    /// only observed between iterations: an in-progress sleep is never interrupted,
    /// so the loop returns at most one interval after the stop request. A panicking
    /// probe is not caught and takes the polling task down with it.
    ///
    /// Returns immediately if a loop is already running for this check. A loop that was
    /// stopped never resumes, even if `start` is called again before it wakes up.
    pub async fn start(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            debug!(component = %self.inner.name, "Readiness: poll loop already running");
            return;
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);
        debug!(
            component = %self.inner.name,
            interval = ?self.inner.interval,
            "Readiness: poll loop started"
        );

        while self.inner.generation.load(Ordering::SeqCst) == generation {
            let ready = (self.inner.probe)();
            self.inner.ready.store(ready, Ordering::SeqCst);

            tokio::time::sleep(self.inner.interval).await;
        }

        debug!(component = %self.inner.name, "Readiness: poll loop stopped");
    }

    /// Marks the check inactive. Idempotent, never blocks.
    pub fn stop(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            _ = self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl ReadinessCheck for PollCheck {
    fn name(&self) -> &str {
        &self.inner.name
    }

    /// Last probe result, `false` until the first probe completes.
    fn ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for PollCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollCheck")
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .field("ready", &self.ready())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn polls_at_intervals_and_stops() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let check = PollCheck::new(
            "my-poll-component",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            },
            Duration::from_millis(50),
        );

        assert_eq!(check.name(), "my-poll-component");
        assert!(!check.ready(), "by default, component should not be ready");

        let running = check.clone();
        let task = tokio::spawn(async move { running.start().await });

        tokio::time::sleep(Duration::from_millis(275)).await;
        check.stop();

        let calls_at_stop = calls.load(Ordering::SeqCst);
        assert!(calls_at_stop >= 5, "expected at least 5 probes, got {calls_at_stop}");
        assert!(check.ready());

        tokio::time::sleep(Duration::from_millis(125)).await;
        assert!(calls.load(Ordering::SeqCst) <= calls_at_stop + 1);
        assert!(task.is_finished());
    }

    fn counting_check(interval: Duration) -> (PollCheck, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let check = PollCheck::new(
            "counted",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            },
            interval,
        );
        (check, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_spawn_another_loop() {
        let (check, calls) = counting_check(Duration::from_millis(50));

        let first = check.clone();
        let running = tokio::spawn(async move { first.start().await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // returns right away, the first loop keeps polling alone
        check.start().await;
        assert!(check.is_active());

        tokio::time::sleep(Duration::from_millis(275)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        check.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(running.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_before_wake_up_keeps_a_single_loop() {
        let (check, calls) = counting_check(Duration::from_millis(100));

        let first = check.clone();
        let old = tokio::spawn(async move { first.start().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // the old loop is still sleeping when the new one starts
        check.stop();
        let second = check.clone();
        let new = tokio::spawn(async move { second.start().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(old.is_finished());
        assert!(!new.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        check.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_follows_latest_probe() {
        let flag = Arc::new(AtomicBool::new(true));
        let probe_flag = flag.clone();
        let check = PollCheck::new(
            "flip",
            move || probe_flag.load(Ordering::SeqCst),
            Duration::from_millis(10),
        );

        let running = check.clone();
        tokio::spawn(async move { running.start().await });

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(check.ready());

        flag.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(!check.ready());

        check.stop();
        check.stop();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(!check.is_active());

        // frozen at the last value once stopped
        flag.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!check.ready());
    }
}
