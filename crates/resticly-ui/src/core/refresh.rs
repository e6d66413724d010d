//! Re-fetching the mounted view after server-side changes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::notify::{NotificationCenter, Severity};
use crate::error::ClientResult;

/// A view that can re-fetch and re-render its collection.
#[async_trait]
pub trait RefreshView: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch the collection again and render it.
    async fn refresh(&self) -> ClientResult<()>;
}

type MountedView = Arc<dyn RefreshView>;

/// Holds the currently mounted view and refreshes it on demand.
#[derive(Clone, Default)]
pub struct ViewRefresher {
    current: Arc<Mutex<Option<MountedView>>>,
    completed: Arc<AtomicU64>,
}

impl std::fmt::Debug for ViewRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRefresher")
            .field("mounted", &self.mounted_name())
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .finish()
    }
}

impl ViewRefresher {
    fn slot(&self) -> MutexGuard<'_, Option<MountedView>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mount `view`, returning the view it replaced.
    pub fn mount(&self, view: MountedView) -> Option<MountedView> {
        debug!(view = view.name(), "view mounted");
        self.slot().replace(view)
    }

    /// Unmount the current view.
    pub fn unmount(&self) -> Option<MountedView> {
        self.slot().take()
    }

    /// Name of the mounted view.
    #[must_use]
    pub fn mounted_name(&self) -> Option<String> {
        self.slot().as_ref().map(|view| view.name().to_string())
    }

    /// Number of refreshes that completed successfully.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Refresh the mounted view. Failures are logged, never propagated.
    ///
    /// Returns `true` when a view was mounted and refreshed successfully.
    pub async fn refresh(&self) -> bool {
        let Some(view) = self.slot().clone() else {
            debug!("refresh requested with no mounted view");
            return false;
        };
        match view.refresh().await {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                warn!(view = view.name(), error = %err, "view refresh failed");
                false
            }
        }
    }

    /// Run a mutating call; on success announce it and refresh the mounted view.
    ///
    /// `describe` turns the call's result into the notification text and
    /// severity. Failures were already shown by the request wrapper and are
    /// returned unchanged without a refresh.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `action`.
    pub async fn after_mutation<T, F, D>(
        &self,
        notifications: &NotificationCenter,
        action: F,
        describe: D,
    ) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
        D: FnOnce(&T) -> (String, Severity),
    {
        match action.await {
            Ok(value) => {
                let (message, severity) = describe(&value);
                notifications.notify(message, severity);
                self.refresh().await;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "mutation failed");
                Err(err)
            }
        }
    }
}
