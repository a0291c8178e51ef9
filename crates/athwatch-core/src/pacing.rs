//! Bounded-concurrency request pacing.
//!
//! [`RequestPacer`] holds a semaphore slot for the whole lifetime of a request
//! plus its trailing pause, so with the default capacity of one, provider
//! calls are strictly sequential and spaced by at least `pause`. Capacity can
//! be raised when provider limits allow; an optional `governor` quota caps the
//! request rate across all slots.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::sync::Semaphore;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pause held after each provider request.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct RequestPacer {
    slots: Arc<Semaphore>,
    capacity: usize,
    pause: Duration,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("capacity", &self.capacity)
            .field("pause", &self.pause)
            .field("quota", &self.limiter.is_some())
            .finish()
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::sequential(DEFAULT_PAUSE)
    }
}

impl RequestPacer {
    pub fn new(capacity: usize, pause: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            pause,
            limiter: None,
        }
    }

    /// One request at a time.
    pub fn sequential(pause: Duration) -> Self {
        Self::new(1, pause)
    }

    /// Adds a rate quota of `limit` requests per `window`.
    pub fn with_quota(mut self, window: Duration, limit: u32) -> Self {
        self.limiter = Some(Arc::new(RateLimiter::direct(quota_from_window(window, limit))));
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Runs `task` inside a slot, then holds the slot for the pause.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition only fails if that
        // changes; run unpaced rather than dropping the request.
        let _permit = self.slots.acquire().await.ok();

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let output = task.await;

        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }

        output
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit.max(1)).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_minute(burst))
}
