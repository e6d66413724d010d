use anyhow::anyhow;
use resticly_api_models::BackupCreateRequest;
use resticly_ui::{AppContext, PollOutcome, Route};
use tracing::info;

use crate::cli::{BackupStartArgs, IdArgs, OutputFormat};
use crate::client::{CliError, CliResult, non_blank, reject};
use crate::output::{Renderer, print};
use crate::views::{mount_route, route_table};

pub(crate) async fn handle_backup_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    route_table(format).open(ctx, &Route::Backups).await?;
    Ok(())
}

pub(crate) async fn handle_backup_status(
    ctx: &AppContext,
    args: IdArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let backup = ctx.api().get_backup(args.id).await?;
    print(Renderer::new(ctx, format).backup(&backup))
}

/// Start a backup and, unless detached, follow it until it finishes.
///
/// Ctrl-C stops following; the run itself keeps going on the server.
pub(crate) async fn handle_backup_start(
    ctx: &AppContext,
    args: BackupStartArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let Some(source_path) = non_blank(&args.source_path) else {
        return Err(reject(
            ctx,
            "validation.required",
            "Please fill in all required fields",
        ));
    };
    let request = BackupCreateRequest {
        repository_id: args.repository_id,
        source_path: source_path.to_string(),
    };
    mount_route(ctx, format, &Route::Backups);
    let create = ctx.mutate(
        ctx.api().create_backup(&request),
        "backups.started",
        "Backup started successfully",
    );

    if args.detach {
        let backup = create.await?;
        let id = backup.id.to_string();
        ctx.notifications().info(ctx.format(
            "backups.detached",
            "Backup {id} is running in the background",
            &[("id", id.as_str())],
        ));
        return Ok(());
    }

    let poller = ctx.backup_poller();
    let handle = poller.submit(create).await?;
    let job_id = handle.job_id();
    let wait = handle.wait();
    tokio::pin!(wait);
    let outcome = tokio::select! {
        outcome = &mut wait => outcome,
        Ok(()) = tokio::signal::ctrl_c() => {
            info!(job_id, "interrupted; detaching from backup");
            ctx.dispose();
            wait.await
        }
    };

    match outcome {
        PollOutcome::Completed(_) => Ok(()),
        PollOutcome::Failed(backup) => Err(CliError::Notified {
            message: backup
                .message
                .unwrap_or_else(|| ctx.text("jobs.backup.failed", "Backup failed")),
            exit_code: 3,
        }),
        PollOutcome::Aborted(err) => Err(err.into()),
        PollOutcome::Cancelled => Err(CliError::failure(anyhow!(
            "stopped following backup {job_id}; it continues on the server"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::Result;
    use httpmock::prelude::*;
    use resticly_ui::Severity;
    use serde_json::json;

    fn start_args(detach: bool) -> BackupStartArgs {
        BackupStartArgs {
            repository_id: 1,
            source_path: "/srv/data".into(),
            detach,
        }
    }

    async fn mock_backup_list(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/backups");
                then.status(200).json_body(json!([]));
            })
            .await;
    }

    async fn mock_created(server: &MockServer, id: i64) {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/backups")
                    .json_body(json!({"repository_id": 1, "source_path": "/srv/data"}));
                then.status(201).json_body(json!({
                    "id": id,
                    "repository_id": 1,
                    "source_path": "/srv/data",
                    "status": "running"
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn failed_backup_exits_with_failure_after_one_notification() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_backup_list(&server).await;
        mock_created(&server, 9).await;
        let status = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/backups/9");
                then.status(200).json_body(json!({
                    "id": 9,
                    "repository_id": 1,
                    "source_path": "/srv/data",
                    "status": "failed",
                    "message": "disk full"
                }));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;

        let err = handle_backup_start(&ctx, start_args(false), OutputFormat::Json)
            .await
            .expect_err("failed backup");

        status.assert_hits_async(1).await;
        assert_eq!(err.exit_code(), 3);
        assert!(err.already_reported());
        let shown = ctx.notifications().active();
        let severities: Vec<Severity> = shown.iter().map(|n| n.severity).collect();
        assert_eq!(severities, vec![Severity::Success, Severity::Danger]);
        assert_eq!(shown[1].message, "Backup failed: disk full");
        Ok(())
    }

    #[tokio::test]
    async fn detached_start_does_not_poll() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_backup_list(&server).await;
        mock_created(&server, 12).await;
        let status = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/backups/12");
                then.status(200).json_body(json!({}));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;

        handle_backup_start(&ctx, start_args(true), OutputFormat::Json)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        status.assert_hits_async(0).await;
        assert_eq!(
            test_support::shown(&ctx),
            vec![
                "Backup started successfully".to_string(),
                "Backup 12 is running in the background".to_string()
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn blank_source_is_rejected_without_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = test_support::context(&server.base_url())?;
        let args = BackupStartArgs {
            repository_id: 1,
            source_path: "   ".into(),
            detach: false,
        };
        let err = handle_backup_start(&ctx, args, OutputFormat::Table)
            .await
            .expect_err("blank source");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            test_support::shown(&ctx),
            vec!["Please fill in all required fields".to_string()]
        );
        Ok(())
    }
}
