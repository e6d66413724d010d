use resticly_api_models::SettingsMap;
use resticly_ui::{AppContext, Route};

use crate::cli::{OutputFormat, SettingsSetArgs};
use crate::client::CliResult;
use crate::views::{mount_route, route_table};

pub(crate) async fn handle_settings_get(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    route_table(format).open(ctx, &Route::Settings).await?;
    Ok(())
}

/// Update the given keys; an empty value clears the stored setting.
pub(crate) async fn handle_settings_set(
    ctx: &AppContext,
    args: SettingsSetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let settings: SettingsMap = args
        .entries
        .into_iter()
        .map(|(key, value)| (key, (!value.is_empty()).then_some(value)))
        .collect();
    mount_route(ctx, format, &Route::Settings);
    ctx.mutate(
        ctx.api().update_settings(&settings),
        "settings.saved",
        "Settings saved successfully",
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn empty_values_clear_keys() -> Result<()> {
        let server = MockServer::start_async().await;
        let save = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/settings").json_body(json!({
                    "keep_daily": "7",
                    "restic_binary": null
                }));
                then.status(200).json_body(json!({"success": true}));
            })
            .await;
        let reload = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/settings");
                then.status(200).json_body(json!({"keep_daily": "7"}));
            })
            .await;
        let ctx = test_support::context(&server.base_url())?;
        let args = SettingsSetArgs {
            entries: vec![
                ("keep_daily".into(), "7".into()),
                ("restic_binary".into(), String::new()),
            ],
        };

        handle_settings_set(&ctx, args, OutputFormat::Table)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        save.assert_async().await;
        reload.assert_async().await;
        assert_eq!(
            test_support::shown(&ctx),
            vec!["Settings saved successfully".to_string()]
        );
        Ok(())
    }
}
