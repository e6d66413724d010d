//! Process-wide count of outstanding requests.
//!
//! The loading indicator is visible exactly while the count is above zero.
//! Every request holds an [`InFlightGuard`] for its whole lifetime, so the
//! count drops on success, on failure, and when the request future is dropped
//! mid-flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

/// Shared in-flight counter with a derived loading flag.
#[derive(Clone, Debug)]
pub struct InFlight {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    count: AtomicUsize,
    loading: watch::Sender<bool>,
}

impl Inner {
    fn publish(&self) {
        // Reading the count inside the watch lock keeps the flag in step with
        // the last writer when acquires and releases race.
        self.loading.send_if_modified(|visible| {
            let busy = self.count.load(Ordering::SeqCst) > 0;
            if *visible == busy {
                false
            } else {
                *visible = busy;
                true
            }
        });
    }
}

impl InFlight {
    /// Create an idle counter.
    #[must_use]
    pub fn new() -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                count: AtomicUsize::new(0),
                loading,
            }),
        }
    }

    /// Register one outstanding request until the guard is dropped.
    #[must_use = "the request is only counted while the guard is alive"]
    pub fn acquire(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        self.inner.publish();
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of requests currently outstanding.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Whether the loading indicator should be visible.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Observe loading visibility changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a request counted while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let _ = self
            .inner
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });
        self.inner.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_tracks_overlapping_requests() {
        let in_flight = InFlight::new();
        assert!(!in_flight.is_loading());

        let first = in_flight.acquire();
        let second = in_flight.acquire();
        assert_eq!(in_flight.count(), 2);
        assert!(in_flight.is_loading());

        drop(first);
        assert!(in_flight.is_loading());
        drop(second);
        assert_eq!(in_flight.count(), 0);
        assert!(!in_flight.is_loading());
    }

    #[tokio::test]
    async fn subscribers_see_visibility_changes() -> anyhow::Result<()> {
        let in_flight = InFlight::new();
        let mut rx = in_flight.subscribe();

        let guard = in_flight.acquire();
        rx.changed().await?;
        assert!(*rx.borrow_and_update());

        drop(guard);
        rx.changed().await?;
        assert!(!*rx.borrow_and_update());
        Ok(())
    }

    #[tokio::test]
    async fn dropped_request_future_releases_its_slot() {
        let in_flight = InFlight::new();
        let counter = in_flight.clone();
        let task = tokio::spawn(async move {
            let _guard = counter.acquire();
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        while in_flight.count() == 0 {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;
        assert_eq!(in_flight.count(), 0);
        assert!(!in_flight.is_loading());
    }
}
