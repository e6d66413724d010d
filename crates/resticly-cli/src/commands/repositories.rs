use std::io::{self, IsTerminal};

use anyhow::anyhow;
use resticly_api_models::{RepositoryCreateRequest, RepositoryKind};
use resticly_ui::{AppContext, Route, Severity};

use crate::cli::{IdArgs, OutputFormat, RemoveArgs, RepoAddArgs};
use crate::client::{CliError, CliResult, non_blank, reject, require_confirmation};
use crate::output::{Renderer, print};
use crate::views::{mount_route, route_table};

pub(crate) async fn handle_repo_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    route_table(format).open(ctx, &Route::Repositories).await?;
    Ok(())
}

pub(crate) async fn handle_repo_show(
    ctx: &AppContext,
    args: IdArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let repo = ctx.api().get_repository(args.id).await?;
    print(Renderer::new(ctx, format).repository(&repo))
}

pub(crate) async fn handle_repo_add(
    ctx: &AppContext,
    args: RepoAddArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = build_create_request(ctx, args)?;
    mount_route(ctx, format, &Route::Repositories);
    ctx.mutate(
        ctx.api().create_repository(&request),
        "repositories.created",
        "Repository created successfully",
    )
    .await?;
    Ok(())
}

pub(crate) async fn handle_repo_check(
    ctx: &AppContext,
    args: IdArgs,
    format: OutputFormat,
) -> CliResult<()> {
    mount_route(ctx, format, &Route::Repositories);
    ctx.mutate_with(ctx.api().check_repository(args.id), |result| {
        let message = ctx.format(
            "repositories.check_completed",
            "Repository check completed: {status}",
            &[("status", result.status.as_str())],
        );
        let severity = if result.status == "ok" {
            Severity::Success
        } else {
            Severity::Warning
        };
        (message, severity)
    })
    .await?;
    Ok(())
}

pub(crate) async fn handle_repo_remove(
    ctx: &AppContext,
    args: RemoveArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_confirmation(ctx, args.yes)?;
    mount_route(ctx, format, &Route::Repositories);
    ctx.mutate(
        ctx.api().delete_repository(args.id),
        "repositories.deleted",
        "Repository deleted successfully",
    )
    .await?;
    Ok(())
}

fn build_create_request(ctx: &AppContext, args: RepoAddArgs) -> CliResult<RepositoryCreateRequest> {
    let (Some(name), Some(location)) = (non_blank(&args.name), non_blank(&args.location)) else {
        return Err(reject(
            ctx,
            "validation.required",
            "Please fill in all required fields",
        ));
    };
    let repo_type = RepositoryKind::from(args.kind);
    if repo_type == RepositoryKind::RestServer
        && !(location.starts_with("http://") || location.starts_with("https://"))
    {
        return Err(reject(
            ctx,
            "validation.rest_url",
            "REST server URL must start with http:// or https://",
        ));
    }
    let password = resolve_password(ctx, args.password.as_deref())?;

    Ok(RepositoryCreateRequest {
        name: name.to_string(),
        repo_type,
        location: location.to_string(),
        password,
        rest_user: args.rest_user.as_deref().and_then(non_blank).map(str::to_string),
        rest_pass: args.rest_pass.as_deref().and_then(non_blank).map(str::to_string),
    })
}

fn resolve_password(ctx: &AppContext, supplied: Option<&str>) -> CliResult<String> {
    if let Some(value) = supplied {
        return non_blank(value).map(str::to_string).ok_or_else(|| {
            reject(
                ctx,
                "validation.required",
                "Please fill in all required fields",
            )
        });
    }

    if io::stdin().is_terminal() {
        let entered = rpassword::prompt_password("Repository password: ").map_err(|err| {
            CliError::failure(anyhow!("failed to read password from stdin: {err}"))
        })?;
        non_blank(&entered).map(str::to_string).ok_or_else(|| {
            reject(
                ctx,
                "validation.required",
                "Please fill in all required fields",
            )
        })
    } else {
        Err(CliError::validation(
            "repository password required; supply --password or RESTICLY_REPO_PASSWORD when running non-interactively",
        ))
    }
}
