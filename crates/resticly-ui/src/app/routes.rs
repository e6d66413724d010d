//! Routing definitions and the page table resolved at startup.

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::AppContext;
use crate::error::ClientResult;

/// Pages of the Resticly interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/` and `/dashboard`.
    Dashboard,
    /// `/repositories`.
    Repositories,
    /// `/backups`.
    Backups,
    /// `/snapshots`.
    Snapshots,
    /// `/snapshots/{id}`.
    SnapshotDetail {
        /// Restic snapshot identifier.
        id: String,
    },
    /// `/scheduler`.
    Scheduler,
    /// `/settings`.
    Settings,
    /// Anything else.
    NotFound {
        /// Path that did not match.
        path: String,
    },
}

impl Route {
    /// Match a path such as `/snapshots/1a2b3c4d`. Trailing slashes and query strings are ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let without_query = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = without_query
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        match segments.as_slice() {
            [] | ["dashboard"] => Self::Dashboard,
            ["repositories"] => Self::Repositories,
            ["backups"] => Self::Backups,
            ["snapshots"] => Self::Snapshots,
            ["snapshots", id] => Self::SnapshotDetail {
                id: (*id).to_string(),
            },
            ["scheduler"] => Self::Scheduler,
            ["settings"] => Self::Settings,
            _ => Self::NotFound {
                path: path.to_string(),
            },
        }
    }

    /// Canonical path of the route.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::Repositories => "/repositories".to_string(),
            Self::Backups => "/backups".to_string(),
            Self::Snapshots => "/snapshots".to_string(),
            Self::SnapshotDetail { id } => format!("/snapshots/{id}"),
            Self::Scheduler => "/scheduler".to_string(),
            Self::Settings => "/settings".to_string(),
            Self::NotFound { path } => path.clone(),
        }
    }

    /// Translation key of the page title.
    #[must_use]
    pub const fn title_key(&self) -> &'static str {
        match self {
            Self::Dashboard => "nav.dashboard",
            Self::Repositories => "nav.repositories",
            Self::Backups => "nav.backups",
            Self::Snapshots => "nav.snapshots",
            Self::SnapshotDetail { .. } => "nav.snapshot_detail",
            Self::Scheduler => "nav.scheduler",
            Self::Settings => "nav.settings",
            Self::NotFound { .. } => "nav.not_found",
        }
    }

    /// Navigation entries in menu order.
    #[must_use]
    pub fn navigation() -> [Self; 6] {
        [
            Self::Dashboard,
            Self::Repositories,
            Self::Backups,
            Self::Snapshots,
            Self::Scheduler,
            Self::Settings,
        ]
    }
}

/// Initializer run when a route is opened.
#[async_trait]
pub trait Page: Send + Sync {
    /// Mount and render the page.
    async fn open(&self, ctx: &AppContext, route: &Route) -> ClientResult<()>;
}

/// Page initializer for every route.
///
/// Building the table requires a page per variant, so a missing page is a
/// compile error rather than a runtime lookup failure.
#[derive(Clone)]
pub struct RouteTable {
    /// Dashboard page.
    pub dashboard: Arc<dyn Page>,
    /// Repository list page.
    pub repositories: Arc<dyn Page>,
    /// Backup list page.
    pub backups: Arc<dyn Page>,
    /// Snapshot list page.
    pub snapshots: Arc<dyn Page>,
    /// Snapshot detail page.
    pub snapshot_detail: Arc<dyn Page>,
    /// Scheduled task page.
    pub scheduler: Arc<dyn Page>,
    /// Settings page.
    pub settings: Arc<dyn Page>,
    /// Fallback page.
    pub not_found: Arc<dyn Page>,
}

impl RouteTable {
    /// Page responsible for `route`.
    #[must_use]
    pub fn resolve(&self, route: &Route) -> Arc<dyn Page> {
        let page = match route {
            Route::Dashboard => &self.dashboard,
            Route::Repositories => &self.repositories,
            Route::Backups => &self.backups,
            Route::Snapshots => &self.snapshots,
            Route::SnapshotDetail { .. } => &self.snapshot_detail,
            Route::Scheduler => &self.scheduler,
            Route::Settings => &self.settings,
            Route::NotFound { .. } => &self.not_found,
        };
        Arc::clone(page)
    }

    /// Resolve and open `route`.
    ///
    /// # Errors
    ///
    /// Propagates the page's request failures.
    pub async fn open(&self, ctx: &AppContext, route: &Route) -> ClientResult<()> {
        self.resolve(route).open(ctx, route).await
    }
}
