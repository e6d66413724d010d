use std::sync::Arc;

use resticly_api_models::{ForgetRequest, RestoreRequest};
use resticly_ui::{AppContext, RefreshView, Route, Severity};

use crate::cli::{
    OutputFormat, SnapshotForgetArgs, SnapshotIdArgs, SnapshotListArgs, SnapshotRestoreArgs,
    SnapshotSyncArgs,
};
use crate::client::{CliResult, non_blank, reject, require_confirmation};
use crate::views::{SnapshotsView, ViewEnv, mount_route, route_table};

pub(crate) async fn handle_snapshot_list(
    ctx: &AppContext,
    args: SnapshotListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    match args.repository_id {
        Some(repository_id) => {
            let view = mount_repository_snapshots(ctx, format, repository_id);
            view.refresh().await?;
        }
        None => route_table(format).open(ctx, &Route::Snapshots).await?,
    }
    Ok(())
}

pub(crate) async fn handle_snapshot_files(
    ctx: &AppContext,
    args: SnapshotIdArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let route = Route::SnapshotDetail { id: args.id };
    route_table(format).open(ctx, &route).await?;
    Ok(())
}

pub(crate) async fn handle_snapshot_restore(
    ctx: &AppContext,
    args: SnapshotRestoreArgs,
) -> CliResult<()> {
    let Some(target_path) = non_blank(&args.target_path) else {
        return Err(reject(
            ctx,
            "validation.restore_target",
            "Please specify a restore target path",
        ));
    };
    let include_paths: Vec<String> = args
        .include_paths
        .iter()
        .filter_map(|path| non_blank(path))
        .map(str::to_string)
        .collect();
    let request = RestoreRequest {
        target_path: target_path.to_string(),
        include_paths: (!include_paths.is_empty()).then_some(include_paths),
    };
    ctx.mutate(
        ctx.api().restore_snapshot(&args.id, &request),
        "snapshots.restored",
        "Snapshot restored successfully",
    )
    .await?;
    Ok(())
}

pub(crate) async fn handle_snapshot_forget(
    ctx: &AppContext,
    args: SnapshotForgetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_confirmation(ctx, args.yes)?;
    mount_route(ctx, format, &Route::Snapshots);
    let request = ForgetRequest { prune: args.prune };
    ctx.mutate(
        ctx.api().forget_snapshot(&args.id, &request),
        "snapshots.forgotten",
        "Snapshot deleted",
    )
    .await?;
    Ok(())
}

pub(crate) async fn handle_snapshot_sync(
    ctx: &AppContext,
    args: SnapshotSyncArgs,
    format: OutputFormat,
) -> CliResult<()> {
    mount_repository_snapshots(ctx, format, args.repository_id);
    ctx.mutate_with(ctx.api().sync_snapshots(args.repository_id), |result| {
        let count = result.count.unwrap_or_default().to_string();
        let message = ctx.format(
            "snapshots.synced",
            "Successfully synced {count} snapshots",
            &[("count", count.as_str())],
        );
        (message, Severity::Success)
    })
    .await?;
    Ok(())
}

fn mount_repository_snapshots(
    ctx: &AppContext,
    format: OutputFormat,
    repository_id: i64,
) -> Arc<dyn RefreshView> {
    let view: Arc<dyn RefreshView> = Arc::new(SnapshotsView::new(
        ViewEnv::new(ctx, format),
        Some(repository_id),
    ));
    ctx.mount(Arc::clone(&view));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn sync_announces_count_and_redraws_repository_snapshots() -> Result<()> {
        let server = MockServer::start_async().await;
        let sync = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/repositories/4/snapshots/sync");
                then.status(200)
                    .json_body(json!({"success": true, "count": 6}));
            })
            .await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/snapshots")
                    .query_param("repository_id", "4");
                then.status(200).json_body(json!([]));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;

        handle_snapshot_sync(&ctx, SnapshotSyncArgs { repository_id: 4 }, OutputFormat::Json)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        sync.assert_async().await;
        list.assert_async().await;
        assert_eq!(
            test_support::shown(&ctx),
            vec!["Successfully synced 6 snapshots".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn restore_sends_only_non_blank_includes() -> Result<()> {
        let server = MockServer::start_async().await;
        let restore = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/snapshots/1a2b3c4d/restore")
                    .json_body(json!({
                        "target_path": "/restore",
                        "include_paths": ["/etc"]
                    }));
                then.status(200).json_body(json!({"success": true}));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;
        let args = SnapshotRestoreArgs {
            id: "1a2b3c4d".into(),
            target_path: " /restore ".into(),
            include_paths: vec!["/etc".into(), " ".into()],
        };

        handle_snapshot_restore(&ctx, args)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        restore.assert_async().await;
        assert_eq!(
            test_support::shown(&ctx),
            vec!["Snapshot restored successfully".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn restore_requires_target() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = test_support::context(&server.base_url())?;
        let args = SnapshotRestoreArgs {
            id: "1a2b3c4d".into(),
            target_path: String::new(),
            include_paths: Vec::new(),
        };
        let err = handle_snapshot_restore(&ctx, args)
            .await
            .expect_err("missing target");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn forget_requires_confirmation() -> Result<()> {
        let server = MockServer::start_async().await;
        let forget = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/snapshots/1a2b3c4d/forget");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;
        let args = SnapshotForgetArgs {
            id: "1a2b3c4d".into(),
            prune: true,
            yes: false,
        };
        let err = handle_snapshot_forget(&ctx, args, OutputFormat::Table)
            .await
            .expect_err("unconfirmed");
        assert_eq!(err.exit_code(), 2);
        forget.assert_hits_async(0).await;
        Ok(())
    }
}
