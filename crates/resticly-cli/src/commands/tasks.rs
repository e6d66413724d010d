use resticly_api_models::{ScheduleKind, ScheduledTaskCreateRequest, ScheduledTaskUpdate};
use resticly_ui::{AppContext, Route};

use crate::cli::{IdArgs, OutputFormat, RemoveArgs, TaskAddArgs};
use crate::client::{CliResult, non_blank, reject, require_confirmation};
use crate::views::{mount_route, route_table};

pub(crate) async fn handle_task_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    route_table(format).open(ctx, &Route::Scheduler).await?;
    Ok(())
}

pub(crate) async fn handle_task_add(
    ctx: &AppContext,
    args: TaskAddArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = build_task(ctx, args)?;
    mount_route(ctx, format, &Route::Scheduler);
    ctx.mutate(
        ctx.api().create_task(&request),
        "tasks.created",
        "Scheduled task created successfully",
    )
    .await?;
    Ok(())
}

pub(crate) async fn handle_task_toggle(
    ctx: &AppContext,
    args: IdArgs,
    enabled: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let update = ScheduledTaskUpdate {
        enabled: Some(enabled),
        ..ScheduledTaskUpdate::default()
    };
    let (key, default) = if enabled {
        ("tasks.enabled", "Task enabled successfully")
    } else {
        ("tasks.disabled", "Task disabled successfully")
    };
    mount_route(ctx, format, &Route::Scheduler);
    ctx.mutate(ctx.api().update_task(args.id, &update), key, default)
        .await?;
    Ok(())
}

pub(crate) async fn handle_task_remove(
    ctx: &AppContext,
    args: RemoveArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_confirmation(ctx, args.yes)?;
    mount_route(ctx, format, &Route::Scheduler);
    ctx.mutate(
        ctx.api().delete_task(args.id),
        "tasks.deleted",
        "Task deleted successfully",
    )
    .await?;
    Ok(())
}

fn build_task(ctx: &AppContext, args: TaskAddArgs) -> CliResult<ScheduledTaskCreateRequest> {
    let (Some(name), Some(source_path)) = (non_blank(&args.name), non_blank(&args.source_path))
    else {
        return Err(reject(
            ctx,
            "validation.required",
            "Please fill in all required fields",
        ));
    };
    let schedule_type = ScheduleKind::from(args.schedule);
    let (cron_expression, interval_seconds) = match schedule_type {
        ScheduleKind::Cron => {
            let Some(expression) = args.cron.as_deref().and_then(non_blank) else {
                return Err(reject(
                    ctx,
                    "validation.cron",
                    "Please enter a cron expression",
                ));
            };
            (Some(expression.to_string()), None)
        }
        ScheduleKind::Interval => {
            let seconds = args
                .interval_hours
                .saturating_mul(3600)
                .saturating_add(args.interval_minutes.saturating_mul(60));
            if seconds == 0 {
                return Err(reject(
                    ctx,
                    "validation.interval",
                    "Please enter a valid interval",
                ));
            }
            (None, Some(seconds))
        }
    };

    Ok(ScheduledTaskCreateRequest {
        repository_id: args.repository_id,
        name: name.to_string(),
        source_path: source_path.to_string(),
        schedule_type,
        cron_expression,
        interval_seconds,
        enabled: !args.disabled,
        tags: args
            .tags
            .iter()
            .filter_map(|tag| non_blank(tag))
            .map(str::to_string)
            .collect(),
    })
}
