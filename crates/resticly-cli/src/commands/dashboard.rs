use resticly_ui::{AppContext, Route};

use crate::cli::{OpenArgs, OutputFormat};
use crate::client::{CliError, CliResult};
use crate::views::route_table;

pub(crate) async fn handle_dashboard(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    route_table(format).open(ctx, &Route::Dashboard).await?;
    Ok(())
}

/// Resolve `args.path` the way the navigation menu does and open that page.
pub(crate) async fn handle_open(
    ctx: &AppContext,
    args: OpenArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let route = Route::from_path(&args.path);
    route_table(format).open(ctx, &route).await?;
    match route {
        Route::NotFound { path } => Err(CliError::Notified {
            message: format!("{}: {path}", ctx.text("nav.not_found", "Page not found")),
            exit_code: 2,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn open_resolves_paths_through_the_route_table() -> Result<()> {
        let server = MockServer::start_async().await;
        let tasks = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/scheduled-tasks");
                then.status(200).json_body(json!([]));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;

        handle_open(
            &ctx,
            OpenArgs {
                path: "/scheduler/".into(),
            },
            OutputFormat::Json,
        )
        .await
        .map_err(|err| anyhow!(err.display_message()))?;

        tasks.assert_async().await;
        assert_eq!(ctx.refresher().mounted_name().as_deref(), Some("scheduler"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_path_exits_with_validation_code() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = test_support::context(&server.base_url())?;
        let err = handle_open(
            &ctx,
            OpenArgs {
                path: "/archive".into(),
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("unknown page");
        assert_eq!(err.exit_code(), 2);
        assert!(err.already_reported());
        assert_eq!(err.display_message(), "Page not found: /archive");
        Ok(())
    }
}
