//! Refreshable list views and the page table.
//!
//! Every list command opens its page through [`route_table`], which mounts
//! the page's view so that later mutations and finished jobs redraw it.

use std::sync::Arc;

use async_trait::async_trait;
use resticly_api_models::{Backup, BackupStatus, Repository, ScheduledTask, Snapshot};
use resticly_ui::{
    ApiClient, AppContext, ClientError, ClientResult, FailureKind, NotificationCenter, Page,
    RefreshView, Route, RouteTable,
};
use tracing::error;

use crate::cli::OutputFormat;
use crate::output::{DashboardSummary, Renderer};

const RECENT_BACKUPS: usize = 5;

type BuildView = fn(ViewEnv, &Route) -> Arc<dyn RefreshView>;

/// What a view needs to fetch and print.
#[derive(Clone)]
pub(crate) struct ViewEnv {
    api: ApiClient,
    notifications: NotificationCenter,
    renderer: Renderer,
}

impl ViewEnv {
    pub(crate) fn new(ctx: &AppContext, format: OutputFormat) -> Self {
        Self {
            api: ctx.api().clone(),
            notifications: ctx.notifications().clone(),
            renderer: Renderer::new(ctx, format),
        }
    }

    fn emit(&self, rendered: serde_json::Result<String>) -> ClientResult<()> {
        match rendered {
            Ok(text) => {
                println!("{text}");
                Ok(())
            }
            Err(err) => {
                let message = format!("failed to format output: {err}");
                error!(error = %err, "render failed");
                self.notifications.danger(message.clone());
                Err(ClientError::RequestFailed {
                    kind: FailureKind::Decode,
                    message,
                })
            }
        }
    }
}

struct RepositoriesView {
    env: ViewEnv,
}

#[async_trait]
impl RefreshView for RepositoriesView {
    fn name(&self) -> &str {
        "repositories"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let list = self.env.api.list_repositories().await?;
        self.env.emit(self.env.renderer.repositories(&list))
    }
}

struct BackupsView {
    env: ViewEnv,
}

#[async_trait]
impl RefreshView for BackupsView {
    fn name(&self) -> &str {
        "backups"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let list = self.env.api.list_backups().await?;
        self.env.emit(self.env.renderer.backups(&list))
    }
}

pub(crate) struct SnapshotsView {
    env: ViewEnv,
    repository_id: Option<i64>,
}

impl SnapshotsView {
    pub(crate) const fn new(env: ViewEnv, repository_id: Option<i64>) -> Self {
        Self { env, repository_id }
    }
}

#[async_trait]
impl RefreshView for SnapshotsView {
    fn name(&self) -> &str {
        "snapshots"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let list = self.env.api.list_snapshots(self.repository_id).await?;
        self.env.emit(self.env.renderer.snapshots(&list))
    }
}

struct SnapshotFilesView {
    env: ViewEnv,
    snapshot_id: String,
}

#[async_trait]
impl RefreshView for SnapshotFilesView {
    fn name(&self) -> &str {
        "snapshot-detail"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let files = self.env.api.snapshot_files(&self.snapshot_id).await?;
        self.env.emit(self.env.renderer.snapshot_files(&files))
    }
}

struct TasksView {
    env: ViewEnv,
}

#[async_trait]
impl RefreshView for TasksView {
    fn name(&self) -> &str {
        "scheduler"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let list = self.env.api.list_tasks().await?;
        self.env.emit(self.env.renderer.tasks(&list))
    }
}

struct SettingsView {
    env: ViewEnv,
}

#[async_trait]
impl RefreshView for SettingsView {
    fn name(&self) -> &str {
        "settings"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let settings = self.env.api.get_settings().await?;
        self.env.emit(self.env.renderer.settings(&settings))
    }
}

struct DashboardView {
    env: ViewEnv,
}

#[async_trait]
impl RefreshView for DashboardView {
    fn name(&self) -> &str {
        "dashboard"
    }

    async fn refresh(&self) -> ClientResult<()> {
        let api = &self.env.api;
        let (repositories, snapshots, backups, tasks) = tokio::try_join!(
            api.list_repositories(),
            api.list_snapshots(None),
            api.list_backups(),
            api.list_tasks(),
        )?;
        let summary = summarize(&repositories, &snapshots, backups, &tasks);
        self.env.emit(self.env.renderer.dashboard(&summary))
    }
}

pub(crate) fn summarize(
    repositories: &[Repository],
    snapshots: &[Snapshot],
    backups: Vec<Backup>,
    tasks: &[ScheduledTask],
) -> DashboardSummary {
    let count = |status: BackupStatus| {
        backups
            .iter()
            .filter(|backup| backup.status == status)
            .count()
    };
    let running = count(BackupStatus::Running);
    let completed = count(BackupStatus::Completed);
    let failed = count(BackupStatus::Failed);
    let bytes_added = backups.iter().map(|backup| backup.bytes_added).sum();
    let total = backups.len();
    let mut recent = backups;
    recent.truncate(RECENT_BACKUPS);

    DashboardSummary {
        repositories: repositories.len(),
        snapshots: snapshots.len(),
        backups: total,
        running,
        completed,
        failed,
        tasks: tasks.len(),
        active_tasks: tasks.iter().filter(|task| task.enabled).count(),
        bytes_added,
        recent,
    }
}

fn dashboard_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(DashboardView { env })
}

fn repositories_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(RepositoriesView { env })
}

fn backups_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(BackupsView { env })
}

fn snapshots_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(SnapshotsView::new(env, None))
}

fn snapshot_detail_view(env: ViewEnv, route: &Route) -> Arc<dyn RefreshView> {
    let snapshot_id = match route {
        Route::SnapshotDetail { id } => id.clone(),
        _ => String::new(),
    };
    Arc::new(SnapshotFilesView { env, snapshot_id })
}

fn tasks_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(TasksView { env })
}

fn settings_view(env: ViewEnv, _: &Route) -> Arc<dyn RefreshView> {
    Arc::new(SettingsView { env })
}

/// Page that mounts a view and renders it once.
struct ViewPage {
    format: OutputFormat,
    build: BuildView,
}

#[async_trait]
impl Page for ViewPage {
    async fn open(&self, ctx: &AppContext, route: &Route) -> ClientResult<()> {
        let view = (self.build)(ViewEnv::new(ctx, self.format), route);
        ctx.mount(Arc::clone(&view));
        view.refresh().await
    }
}

struct NotFoundPage;

#[async_trait]
impl Page for NotFoundPage {
    async fn open(&self, ctx: &AppContext, route: &Route) -> ClientResult<()> {
        ctx.refresher().unmount();
        let title = ctx.text(route.title_key(), "Page not found");
        ctx.notifications()
            .warning(format!("{title}: {}", route.path()));
        Ok(())
    }
}

fn page(format: OutputFormat, build: BuildView) -> Arc<dyn Page> {
    Arc::new(ViewPage { format, build })
}

/// Page for every route, rendering in `format`.
pub(crate) fn route_table(format: OutputFormat) -> RouteTable {
    RouteTable {
        dashboard: page(format, dashboard_view),
        repositories: page(format, repositories_view),
        backups: page(format, backups_view),
        snapshots: page(format, snapshots_view),
        snapshot_detail: page(format, snapshot_detail_view),
        scheduler: page(format, tasks_view),
        settings: page(format, settings_view),
        not_found: Arc::new(NotFoundPage),
    }
}

/// Mount the view of `route` without rendering it, so the next refresh draws it.
pub(crate) fn mount_route(ctx: &AppContext, format: OutputFormat, route: &Route) {
    let build: BuildView = match route {
        Route::Dashboard => dashboard_view,
        Route::Repositories => repositories_view,
        Route::Backups => backups_view,
        Route::Snapshots => snapshots_view,
        Route::SnapshotDetail { .. } => snapshot_detail_view,
        Route::Scheduler => tasks_view,
        Route::Settings => settings_view,
        Route::NotFound { .. } => {
            ctx.refresher().unmount();
            return;
        }
    };
    ctx.mount(build(ViewEnv::new(ctx, format), route));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::Result;
    use httpmock::prelude::*;
    use resticly_api_models::ScheduleKind;
    use resticly_ui::Severity;
    use serde_json::json;

    fn backup(id: i64, status: BackupStatus, bytes_added: u64) -> Backup {
        Backup {
            id,
            repository_id: 1,
            repository_name: None,
            source_path: "/srv".into(),
            start_time: None,
            end_time: None,
            status,
            message: None,
            files_new: 0,
            files_changed: 0,
            bytes_added,
            snapshot_id: None,
        }
    }

    #[test]
    fn summary_counts_statuses_and_keeps_recent_runs() {
        let backups = (1..=7)
            .map(|id| {
                let status = match id % 3 {
                    0 => BackupStatus::Failed,
                    1 => BackupStatus::Completed,
                    _ => BackupStatus::Running,
                };
                backup(id, status, 100)
            })
            .collect();
        let tasks = vec![
            ScheduledTask {
                id: 1,
                repository_id: 1,
                repository_name: None,
                name: "nightly".into(),
                source_path: None,
                schedule_type: ScheduleKind::Cron,
                cron_expression: Some("0 2 * * *".into()),
                interval_seconds: None,
                enabled: true,
                last_run: None,
                next_run: None,
                created_at: None,
                tags: Vec::new(),
            },
        ];
        let summary = summarize(&[], &[], backups, &tasks);
        assert_eq!(summary.backups, 7);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.running, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.bytes_added, 700);
        assert_eq!(summary.recent.len(), RECENT_BACKUPS);
        assert_eq!(summary.active_tasks, 1);
    }

    #[tokio::test]
    async fn opening_a_route_mounts_its_view() -> Result<()> {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/repositories");
                then.status(200).json_body(json!([]));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;
        let table = route_table(OutputFormat::Json);

        table.open(&ctx, &Route::from_path("/repositories")).await?;
        list.assert_async().await;
        assert_eq!(ctx.refresher().mounted_name().as_deref(), Some("repositories"));

        assert!(ctx.refresher().refresh().await);
        list.assert_hits_async(2).await;
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_detail_fetches_its_files() -> Result<()> {
        let server = MockServer::start_async().await;
        let files = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/snapshots/1a2b3c4d/files");
                then.status(200).json_body(json!([
                    {"struct_type": "snapshot", "id": "1a2b3c4d"},
                    {"name": "etc", "type": "dir", "path": "/etc"}
                ]));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;
        route_table(OutputFormat::Table)
            .open(&ctx, &Route::from_path("/snapshots/1a2b3c4d"))
            .await?;
        files.assert_async().await;
        assert_eq!(
            ctx.refresher().mounted_name().as_deref(),
            Some("snapshot-detail")
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_paths_warn_and_unmount() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = test_support::context(&server.base_url())?;
        mount_route(&ctx, OutputFormat::Table, &Route::Backups);
        assert_eq!(ctx.refresher().mounted_name().as_deref(), Some("backups"));

        route_table(OutputFormat::Table)
            .open(&ctx, &Route::from_path("/nowhere"))
            .await?;
        assert!(ctx.refresher().mounted_name().is_none());
        let shown = ctx.notifications().active();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].severity, Severity::Warning);
        assert_eq!(shown[0].message, "Page not found: /nowhere");
        Ok(())
    }

    #[tokio::test]
    async fn dashboard_fetches_every_collection() -> Result<()> {
        let server = MockServer::start_async().await;
        let mut mocks = Vec::new();
        for path in [
            "/api/repositories",
            "/api/snapshots",
            "/api/backups",
            "/api/scheduled-tasks",
        ] {
            mocks.push(
                server
                    .mock_async(|when, then| {
                        when.method(GET).path(path);
                        then.status(200).json_body(json!([]));
                    })
                    .await,
            );
        }
        let ctx = test_support::context(&server.base_url())?;
        route_table(OutputFormat::Json)
            .open(&ctx, &Route::Dashboard)
            .await?;
        for mock in &mocks {
            mock.assert_async().await;
        }
        assert_eq!(ctx.in_flight().count(), 0);
        Ok(())
    }
}
