//! Connection bookkeeping: the live-connection set `spec.md` §4.5 says every
//! endpoint maintains, plus the stop sequence built on top of it — mark
//! stopping, signal every live connection to wind down (GOAWAY for HTTP/2,
//! close-idle for HTTP/1 — both via `hyper_util`'s unified
//! `graceful_shutdown`), wait for the set to empty or a grace deadline, then
//! force-close (`abort`) whatever remains. Per Design Notes' redesign flag,
//! both protocols are force-closed after the same grace deadline.
//!
//! Grounded on `jizhuozhi-hermes/gateway/src/server/mod.rs`'s
//! `run_proxy_server` drain loop, generalized from its semaphore/counter
//! pair to a `DashMap` of abortable `JoinHandle`s so "force-close" is a real
//! guarantee rather than a best-effort wait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared by the accept loop (which registers each connection) and
/// `Endpoint::impl_stop` (which signals and drains them).
pub struct ConnectionTracker {
    next_id: AtomicU64,
    live: DashMap<u64, JoinHandle<()>>,
    stopping: watch::Sender<bool>,
}

impl ConnectionTracker {
    pub fn new() -> Arc<Self> {
        let (stopping, _) = watch::channel(false);
        Arc::new(Self { next_id: AtomicU64::new(0), live: DashMap::new(), stopping })
    }

    pub fn stopping_receiver(&self) -> watch::Receiver<bool> {
        self.stopping.subscribe()
    }

    pub fn is_stopping(&self) -> bool {
        *self.stopping.borrow()
    }

    /// Register a just-spawned connection task. Its completion is noticed
    /// lazily (by `stop`'s drain loop, or the next `register` call) rather
    /// than self-reported, avoiding a chicken-and-egg dependency on the
    /// task knowing its own tracker key before it is assigned one.
    pub fn register(&self, handle: JoinHandle<()>) {
        self.live.retain(|_, h| !h.is_finished());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, handle);
    }

    pub fn len(&self) -> usize {
        self.live.retain(|_, h| !h.is_finished());
        self.live.len()
    }

    /// Mark stopping (every connection task sees this on its next
    /// `tokio::select!` poll and calls its own `graceful_shutdown`), wait up
    /// to `grace_period` for the set to drain, then abort whatever remains.
    pub async fn stop(&self, grace_period: Duration) {
        let _ = self.stopping.send(true);

        let deadline = tokio::time::Instant::now() + grace_period;
        loop {
            self.live.retain(|_, h| !h.is_finished());
            if self.live.is_empty() || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let remaining: Vec<u64> = self.live.iter().map(|e| *e.key()).collect();
        if !remaining.is_empty() {
            tracing::warn!(count = remaining.len(), "grace period elapsed; force-closing connections");
        }
        for id in remaining {
            if let Some((_, handle)) = self.live.remove(&id) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_waits_for_connections_to_drain_naturally() {
        let tracker = ConnectionTracker::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        tracker.register(handle);
        tracker.stop(Duration::from_millis(500)).await;
        assert_eq!(tracker.len(), 0);
    }

    #[tokio::test]
    async fn stop_force_aborts_connections_past_the_grace_period() {
        let tracker = ConnectionTracker::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        tracker.register(handle);
        tracker.stop(Duration::from_millis(20)).await;
        assert_eq!(tracker.len(), 0);
    }
}
