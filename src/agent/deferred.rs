//! Deferred actions
//!
//! Engagement actions never run inline. Each one is spawned behind its own
//! randomly drawn delay, so output is spread out and completion order is
//! unspecified. Already-deferred actions are never cancelled.

use crate::policy::{DelayRange, RandomSource};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Clone)]
pub struct Deferrer {
    range: DelayRange,
    rng: Arc<RandomSource>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Deferrer {
    pub fn new(range: DelayRange, rng: Arc<RandomSource>) -> Self {
        Self {
            range,
            rng,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn range(&self) -> DelayRange {
        self.range
    }

    /// Run `action` after a random delay; returns the delay drawn
    pub fn defer<F>(&self, label: &'static str, action: F) -> Duration
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.rng.delay(self.range);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight {
            count: self.in_flight.clone(),
            idle: self.idle.clone(),
        };
        debug!("Deferring {} by {:?}", label, delay);

        tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            action.await;
        });

        delay
    }

    /// Actions scheduled but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every deferred action has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Releases one in-flight slot when dropped, even if the action panics
struct InFlight {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_action_runs_after_its_delay() {
        let deferrer = Deferrer::new(DelayRange::from_secs(1, 6), Arc::new(RandomSource::seeded(1)));
        let done = Arc::new(Mutex::new(false));

        let flag = done.clone();
        let delay = deferrer.defer("test", async move {
            *flag.lock() = true;
        });
        assert!(DelayRange::from_secs(1, 6).contains(delay));
        assert!(!*done.lock());

        tokio::time::sleep(delay - Duration::from_millis(1)).await;
        assert!(!*done.lock());

        deferrer.wait_idle().await;
        assert!(*done.lock());
        assert_eq!(deferrer.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_follows_delay_order() {
        let deferrer = Deferrer::new(DelayRange::from_secs(1, 6), Arc::new(RandomSource::seeded(9)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut delays = Vec::new();
        for i in 0..10usize {
            let order = order.clone();
            let delay = deferrer.defer("test", async move {
                order.lock().push(i);
            });
            delays.push((delay, i));
        }
        assert_eq!(deferrer.in_flight(), 10);

        deferrer.wait_idle().await;

        let order: Vec<usize> = order.lock().clone();
        assert_eq!(order.len(), 10);
        assert!(order.windows(2).all(|w| delays[w[0]].0 <= delays[w[1]].0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_pending_until_actions_finish() {
        let deferrer = Deferrer::new(DelayRange::from_secs(1, 1), Arc::new(RandomSource::seeded(5)));
        deferrer.defer("test", async {});

        let mut idle = tokio_test::task::spawn(deferrer.wait_idle());
        tokio_test::assert_pending!(idle.poll());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(idle.is_woken());
        tokio_test::assert_ready!(idle.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_action_still_releases_wait_idle() {
        let deferrer = Deferrer::new(DelayRange::from_secs(1, 2), Arc::new(RandomSource::seeded(4)));
        let done = Arc::new(Mutex::new(false));

        deferrer.defer("panics", async {
            panic!("action failed");
        });
        let flag = done.clone();
        deferrer.defer("test", async move {
            *flag.lock() = true;
        });

        deferrer.wait_idle().await;
        assert!(*done.lock());
        assert_eq!(deferrer.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_returns_immediately_when_empty() {
        let deferrer = Deferrer::new(DelayRange::default(), Arc::new(RandomSource::seeded(3)));
        deferrer.wait_idle().await;
    }
}
