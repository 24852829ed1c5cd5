//! Token-bucket rate limiting with a FIFO waiter queue and cancellation
//! support, as required by `spec.md` §4.2.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{Result, WharfError};

/// Abstracts the monotonic time source. Production uses [`TokioClock`],
/// which rides `tokio::time::Instant` so that `#[tokio::test(start_paused =
/// true)]` suites can drive it deterministically via `tokio::time::advance`.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary, monotonically increasing epoch.
    fn now(&self) -> f64;
}

pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self { start: tokio::time::Instant::now() }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Options controlling a single grant request, per `spec.md` §4.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantOptions {
    /// Reject rather than queue if the projected wait would exceed this.
    /// `Some(0.0)` makes the call fully non-blocking.
    pub max_wait_time: Option<f64>,
    /// Reject immediately if the queue already holds this many waiters.
    pub max_queue_size: Option<usize>,
    /// If set, and the queue is currently empty, grant `available` rather
    /// than queuing when `available / amount` is at least this fraction.
    pub min_grant_fraction: Option<f64>,
}

/// Outcome of a successful `request_grant`: how much was granted (may be
/// less than requested, for a partial grant) and how long the caller waited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grant {
    pub granted_amount: f64,
    pub wait_time: f64,
}

struct QueueEntry {
    ticket: u64,
    wanted: f64,
}

struct Inner {
    capacity: f64,
    refill_per_sec: f64,
    available: f64,
    last_refill: f64,
    queue: VecDeque<QueueEntry>,
    next_ticket: u64,
}

impl Inner {
    fn refill(&mut self, now: f64) {
        let elapsed = (now - self.last_refill).max(0.0);
        self.available = (self.available + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Sum of tokens reserved by waiters strictly ahead of `ticket` (or all
    /// waiters, if `ticket` is `None`).
    fn ahead_of(&self, ticket: Option<u64>) -> f64 {
        self.queue
            .iter()
            .take_while(|e| ticket.map(|t| e.ticket != t).unwrap_or(true))
            .map(|e| e.wanted)
            .sum()
    }

    fn remove(&mut self, ticket: u64) {
        self.queue.retain(|e| e.ticket != ticket);
    }
}

/// A token bucket: capacity, steady refill rate, and a FIFO queue of
/// waiters blocked on `request_grant` when tokens are momentarily
/// unavailable. Each waiter schedules its own wakeup (via `tokio::time::sleep`
/// on a deadline computed at enqueue time) rather than depending on another
/// caller to drive progress.
pub struct TokenBucket {
    clock: Box<dyn Clock>,
    inner: Mutex<Inner>,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self::with_clock(capacity, refill_per_sec, Box::new(TokioClock::new()))
    }

    pub fn with_clock(capacity: f64, refill_per_sec: f64, clock: Box<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            inner: Mutex::new(Inner {
                capacity,
                refill_per_sec,
                available: capacity,
                last_refill: now,
                queue: VecDeque::new(),
                next_ticket: 0,
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.inner.lock().unwrap().capacity
    }

    pub fn available(&self) -> f64 {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        inner.refill(now);
        inner.available
    }

    pub fn waiter_count(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Request `amount` tokens, per `spec.md` §4.2.
    ///
    /// Returns immediately if enough tokens are available and no earlier
    /// waiter is queued. Otherwise enqueues a FIFO waiter whose wake time is
    /// computed from the refill rate and the amount reserved ahead of it,
    /// then sleeps until that instant. `fails with RateLimitExceeded` if the
    /// projected wait exceeds `opts.max_wait_time` or the queue is already at
    /// `opts.max_queue_size`.
    pub async fn request_grant(&self, amount: f64, opts: GrantOptions) -> Result<Grant> {
        let now0 = self.clock.now();
        let ticket = {
            let mut inner = self.inner.lock().unwrap();
            inner.refill(now0);

            if inner.queue.is_empty() && amount <= inner.available {
                inner.available -= amount;
                return Ok(Grant { granted_amount: amount, wait_time: 0.0 });
            }

            if inner.queue.is_empty() {
                if let Some(frac) = opts.min_grant_fraction {
                    if inner.available > 0.0 && inner.available / amount >= frac {
                        let granted = inner.available;
                        inner.available = 0.0;
                        return Ok(Grant { granted_amount: granted, wait_time: 0.0 });
                    }
                }
            }

            let ahead = inner.ahead_of(None);
            let deficit = (ahead + amount - inner.available).max(0.0);
            let projected_wait = deficit / inner.refill_per_sec;

            if let Some(max_wait) = opts.max_wait_time {
                if projected_wait > max_wait {
                    return Err(WharfError::RateLimitExceeded);
                }
            }
            if let Some(max_queue) = opts.max_queue_size {
                if inner.queue.len() >= max_queue {
                    return Err(WharfError::RateLimitExceeded);
                }
            }

            let ticket = inner.next_ticket;
            inner.next_ticket += 1;
            inner.queue.push_back(QueueEntry { ticket, wanted: amount });
            ticket
        };

        let guard = WaiterGuard { bucket: self, ticket, armed: true };
        loop {
            let wait_secs = {
                let mut inner = self.inner.lock().unwrap();
                let now = self.clock.now();
                inner.refill(now);
                let ahead = inner.ahead_of(Some(ticket));
                let deficit = (ahead + amount - inner.available).max(0.0);
                deficit / inner.refill_per_sec
            };

            if wait_secs <= 0.0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_secs_f64(wait_secs)).await;
        }

        let mut inner = self.inner.lock().unwrap();
        let now = self.clock.now();
        inner.refill(now);
        inner.remove(ticket);
        inner.available -= amount;
        std::mem::forget(guard);
        drop(inner);

        let wait_time = self.clock.now() - now0;
        Ok(Grant { granted_amount: amount, wait_time })
    }
}

/// Removes a cancelled waiter's reservation from the queue so that waiters
/// behind it have their scheduled wake time recomputed against the tokens it
/// would otherwise have held, per spec's cancellation rule. Disarmed (via
/// `mem::forget`) once the waiter is granted normally.
struct WaiterGuard<'a> {
    bucket: &'a TokenBucket,
    ticket: u64,
    armed: bool,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.bucket.inner.lock().unwrap().remove(self.ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_immediately_within_capacity() {
        let bucket = TokenBucket::new(10.0, 1.0);
        let grant = bucket.request_grant(5.0, GrantOptions::default()).await.unwrap();
        assert_eq!(grant.wait_time, 0.0);
        assert!((bucket.available() - 5.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn non_blocking_grant_over_limit_fails_fast() {
        let bucket = TokenBucket::new(1.0, 1.0);
        let err = bucket
            .request_grant(5.0, GrantOptions { max_wait_time: Some(0.0), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, WharfError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn queue_size_limit_rejects_overflow() {
        let bucket = Arc::new(TokenBucket::new(0.0, 1.0));
        let opts = GrantOptions { max_queue_size: Some(1), ..Default::default() };
        let b1 = bucket.clone();
        tokio::spawn(async move {
            let _ = b1.request_grant(1.0, GrantOptions::default()).await;
        });
        tokio::task::yield_now().await;
        let err = bucket.request_grant(1.0, opts).await.unwrap_err();
        assert!(matches!(err, WharfError::RateLimitExceeded));
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        let clock = crate::ratelimit::tests::FixedClock::new();
        let bucket = TokenBucket::with_clock(10.0, 5.0, Box::new(clock));
        assert_eq!(bucket.available(), 10.0);
    }

    pub(crate) struct FixedClock {
        t: std::sync::Mutex<f64>,
    }

    impl FixedClock {
        pub(crate) fn new() -> Self {
            Self { t: std::sync::Mutex::new(0.0) }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> f64 {
            *self.t.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_fifo_in_enqueue_order() {
        let bucket = Arc::new(TokenBucket::new(0.0, 10.0));
        let order = Arc::new(Mutex::new(Vec::new()));

        let b1 = bucket.clone();
        let o1 = order.clone();
        let h1 = tokio::spawn(async move {
            b1.request_grant(5.0, GrantOptions::default()).await.unwrap();
            o1.lock().unwrap().push(1);
        });
        tokio::time::advance(std::time::Duration::from_millis(10)).await;

        let b2 = bucket.clone();
        let o2 = order.clone();
        let h2 = tokio::spawn(async move {
            b2.request_grant(5.0, GrantOptions::default()).await.unwrap();
            o2.lock().unwrap().push(2);
        });

        tokio::time::advance(std::time::Duration::from_millis(2000)).await;
        h1.await.unwrap();
        h2.await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_reservation_for_next_waiter() {
        let bucket = Arc::new(TokenBucket::new(0.0, 10.0));

        let b1 = bucket.clone();
        let h1 = tokio::spawn(async move {
            let _ = b1.request_grant(100.0, GrantOptions::default()).await;
        });
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        h1.abort();
        let _ = h1.await;

        // h1's huge reservation must not block h2's much smaller one.
        tokio::time::advance(std::time::Duration::from_millis(5)).await;
        let b2 = bucket.clone();
        let grant = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            b2.request_grant(1.0, GrantOptions::default()),
        )
        .await
        .expect("should not time out waiting behind a cancelled waiter")
        .unwrap();
        assert!(grant.wait_time < 1.0);
    }
}
