//! Argument parsing and command dispatch for the Resticly CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use resticly_api_models::{RepositoryKind, ScheduleKind};
use resticly_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use resticly_ui::config::DEFAULT_API_URL;
use resticly_ui::{AppContext, SystemHints, UiConfig};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{CliError, CliResult};
use crate::commands::backups::{handle_backup_list, handle_backup_start, handle_backup_status};
use crate::commands::dashboard::{handle_dashboard, handle_open};
use crate::commands::preferences::{handle_language, handle_prefs_show, handle_theme};
use crate::commands::repositories::{
    handle_repo_add, handle_repo_check, handle_repo_list, handle_repo_remove, handle_repo_show,
};
use crate::commands::settings::{handle_settings_get, handle_settings_set};
use crate::commands::snapshots::{
    handle_snapshot_files, handle_snapshot_forget, handle_snapshot_list, handle_snapshot_restore,
    handle_snapshot_sync,
};
use crate::commands::tasks::{
    handle_task_add, handle_task_list, handle_task_remove, handle_task_toggle,
};
use crate::console::Console;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_TOAST_MS: u64 = 3_000;

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: env!("CARGO_PKG_VERSION"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }

    let trace_id = Uuid::new_v4().to_string();
    let command_name = command_label(&cli.command);
    let ctx = match AppContext::bootstrap(ui_config(&cli, &trace_id), &SystemHints::detect()) {
        Ok(ctx) => ctx,
        Err(err) => {
            let err = CliError::failure(err);
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let console = Console::attach(&ctx, cli.output);
    info!(
        command = command_name,
        trace_id = %trace_id,
        build = build_sha(),
        "running command"
    );

    let result = dispatch(cli.command, &ctx, cli.output).await;
    ctx.dispose();
    console.finish().await;

    match result {
        Ok(()) => 0,
        Err(err) => {
            if !err.already_reported() {
                eprintln!("error: {}", err.display_message());
            }
            debug!(command = command_name, exit_code = err.exit_code(), "command failed");
            err.exit_code()
        }
    }
}

pub(crate) fn ui_config(cli: &Cli, trace_id: &str) -> UiConfig {
    UiConfig {
        api_url: cli.api_url.to_string(),
        timeout: Duration::from_secs(cli.timeout),
        poll_interval: Duration::from_millis(cli.poll_interval_ms.max(1)),
        notification_duration: Duration::from_millis(cli.toast_ms),
        state_dir: cli.state_dir.clone(),
        request_id: Some(trace_id.to_string()),
    }
}

pub(crate) async fn dispatch(
    command: Command,
    ctx: &AppContext,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        Command::Dashboard => handle_dashboard(ctx, format).await,
        Command::Open(args) => handle_open(ctx, args, format).await,
        Command::Repo(repo) => match repo {
            RepoCommand::Ls => handle_repo_list(ctx, format).await,
            RepoCommand::Add(args) => handle_repo_add(ctx, args, format).await,
            RepoCommand::Show(args) => handle_repo_show(ctx, args, format).await,
            RepoCommand::Check(args) => handle_repo_check(ctx, args, format).await,
            RepoCommand::Rm(args) => handle_repo_remove(ctx, args, format).await,
        },
        Command::Backup(backup) => match backup {
            BackupCommand::Ls => handle_backup_list(ctx, format).await,
            BackupCommand::Start(args) => handle_backup_start(ctx, args, format).await,
            BackupCommand::Status(args) => handle_backup_status(ctx, args, format).await,
        },
        Command::Snapshot(snapshot) => match snapshot {
            SnapshotCommand::Ls(args) => handle_snapshot_list(ctx, args, format).await,
            SnapshotCommand::Files(args) => handle_snapshot_files(ctx, args, format).await,
            SnapshotCommand::Restore(args) => handle_snapshot_restore(ctx, args).await,
            SnapshotCommand::Forget(args) => handle_snapshot_forget(ctx, args, format).await,
            SnapshotCommand::Sync(args) => handle_snapshot_sync(ctx, args, format).await,
        },
        Command::Task(task) => match task {
            TaskCommand::Ls => handle_task_list(ctx, format).await,
            TaskCommand::Add(args) => handle_task_add(ctx, args, format).await,
            TaskCommand::Enable(args) => handle_task_toggle(ctx, args, true, format).await,
            TaskCommand::Disable(args) => handle_task_toggle(ctx, args, false, format).await,
            TaskCommand::Rm(args) => handle_task_remove(ctx, args, format).await,
        },
        Command::Settings(settings) => match settings {
            SettingsCommand::Get => handle_settings_get(ctx, format).await,
            SettingsCommand::Set(args) => handle_settings_set(ctx, args, format).await,
        },
        Command::Prefs(prefs) => match prefs {
            PrefsCommand::Show => handle_prefs_show(ctx, format),
            PrefsCommand::Theme(args) => handle_theme(ctx, args.mode),
            PrefsCommand::Language(args) => handle_language(ctx, args.language),
        },
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "resticly",
    version,
    about = "Command-line front end for the Resticly backup manager"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "RESTICLY_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    #[arg(
        long,
        global = true,
        env = "RESTICLY_HTTP_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "poll-interval-ms",
        global = true,
        env = "RESTICLY_POLL_INTERVAL_MS",
        default_value_t = DEFAULT_POLL_INTERVAL_MS
    )]
    pub(crate) poll_interval_ms: u64,
    #[arg(
        long = "toast-ms",
        global = true,
        env = "RESTICLY_TOAST_MS",
        default_value_t = DEFAULT_TOAST_MS
    )]
    pub(crate) toast_ms: u64,
    #[arg(
        long,
        global = true,
        env = "RESTICLY_STATE_DIR",
        help = "Directory holding persisted preferences"
    )]
    pub(crate) state_dir: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "RESTICLY_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "RESTICLY_LOG_FORMAT",
        value_parser = parse_log_format
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Summary of repositories, recent backups and scheduled tasks.
    Dashboard,
    /// Open a page by path, e.g. `/snapshots/1a2b3c4d`.
    Open(OpenArgs),
    /// Manage repositories.
    #[command(subcommand)]
    Repo(RepoCommand),
    /// Start and inspect backups.
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Browse, restore and forget snapshots.
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// Manage scheduled backup tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Read and update server settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Local theme and language preferences.
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Debug, Args)]
pub(crate) struct OpenArgs {
    #[arg(help = "Page path such as /repositories or /snapshots/<id>")]
    pub(crate) path: String,
}

#[derive(Debug, Subcommand)]
pub(crate) enum RepoCommand {
    Ls,
    Add(RepoAddArgs),
    Show(IdArgs),
    Check(IdArgs),
    Rm(RemoveArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum RepoKindArg {
    Local,
    RestServer,
    Sftp,
    S3,
}

impl From<RepoKindArg> for RepositoryKind {
    fn from(value: RepoKindArg) -> Self {
        match value {
            RepoKindArg::Local => Self::Local,
            RepoKindArg::RestServer => Self::RestServer,
            RepoKindArg::Sftp => Self::Sftp,
            RepoKindArg::S3 => Self::S3,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct RepoAddArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long = "type", value_enum, default_value_t = RepoKindArg::Local)]
    pub(crate) kind: RepoKindArg,
    #[arg(long, help = "Path, REST server URL, or backend location")]
    pub(crate) location: String,
    #[arg(
        long,
        env = "RESTICLY_REPO_PASSWORD",
        help = "Repository password (prompted when omitted on a terminal)"
    )]
    pub(crate) password: Option<String>,
    #[arg(long)]
    pub(crate) rest_user: Option<String>,
    #[arg(long, env = "RESTICLY_REST_PASS")]
    pub(crate) rest_pass: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct IdArgs {
    #[arg(help = "Numeric identifier")]
    pub(crate) id: i64,
}

#[derive(Debug, Args)]
pub(crate) struct RemoveArgs {
    #[arg(help = "Numeric identifier")]
    pub(crate) id: i64,
    #[arg(long, help = "Confirm the deletion")]
    pub(crate) yes: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum BackupCommand {
    Ls,
    Start(BackupStartArgs),
    Status(IdArgs),
}

#[derive(Debug, Args)]
pub(crate) struct BackupStartArgs {
    #[arg(long = "repository")]
    pub(crate) repository_id: i64,
    #[arg(long = "source")]
    pub(crate) source_path: String,
    #[arg(long, help = "Return once the backup is accepted instead of waiting")]
    pub(crate) detach: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum SnapshotCommand {
    Ls(SnapshotListArgs),
    Files(SnapshotIdArgs),
    Restore(SnapshotRestoreArgs),
    Forget(SnapshotForgetArgs),
    Sync(SnapshotSyncArgs),
}

#[derive(Debug, Args, Default)]
pub(crate) struct SnapshotListArgs {
    #[arg(long = "repository")]
    pub(crate) repository_id: Option<i64>,
}

#[derive(Debug, Args)]
pub(crate) struct SnapshotIdArgs {
    #[arg(help = "Restic snapshot identifier")]
    pub(crate) id: String,
}

#[derive(Debug, Args)]
pub(crate) struct SnapshotRestoreArgs {
    #[arg(help = "Restic snapshot identifier")]
    pub(crate) id: String,
    #[arg(long = "target")]
    pub(crate) target_path: String,
    #[arg(long = "include", help = "Restore only these paths (repeatable)")]
    pub(crate) include_paths: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct SnapshotForgetArgs {
    #[arg(help = "Restic snapshot identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Prune unreferenced data afterwards")]
    pub(crate) prune: bool,
    #[arg(long, help = "Confirm the deletion")]
    pub(crate) yes: bool,
}

#[derive(Debug, Args)]
pub(crate) struct SnapshotSyncArgs {
    #[arg(long = "repository")]
    pub(crate) repository_id: i64,
}

#[derive(Debug, Subcommand)]
pub(crate) enum TaskCommand {
    Ls,
    Add(TaskAddArgs),
    Enable(IdArgs),
    Disable(IdArgs),
    Rm(RemoveArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScheduleArg {
    Cron,
    Interval,
}

impl From<ScheduleArg> for ScheduleKind {
    fn from(value: ScheduleArg) -> Self {
        match value {
            ScheduleArg::Cron => Self::Cron,
            ScheduleArg::Interval => Self::Interval,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct TaskAddArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long = "repository")]
    pub(crate) repository_id: i64,
    #[arg(long = "source")]
    pub(crate) source_path: String,
    #[arg(long, value_enum)]
    pub(crate) schedule: ScheduleArg,
    #[arg(long, help = "Cron expression for cron schedules")]
    pub(crate) cron: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub(crate) interval_hours: u64,
    #[arg(long, default_value_t = 0)]
    pub(crate) interval_minutes: u64,
    #[arg(long, help = "Create the task disabled")]
    pub(crate) disabled: bool,
    #[arg(long = "tag", help = "Tag attached to snapshots (repeatable)")]
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum SettingsCommand {
    Get,
    Set(SettingsSetArgs),
}

#[derive(Debug, Args)]
pub(crate) struct SettingsSetArgs {
    #[arg(
        required = true,
        value_parser = parse_setting,
        help = "Settings as KEY=VALUE; an empty value clears the key"
    )]
    pub(crate) entries: Vec<(String, String)>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum PrefsCommand {
    Show,
    Theme(ThemeArgs),
    Language(LanguageArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

#[derive(Debug, Args)]
pub(crate) struct ThemeArgs {
    #[arg(value_enum)]
    pub(crate) mode: ThemeArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LanguageArg {
    En,
    Zh,
}

#[derive(Debug, Args)]
pub(crate) struct LanguageArgs {
    #[arg(value_enum)]
    pub(crate) language: LanguageArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    LogFormat::parse(input).ok_or_else(|| {
        format!("invalid log format '{input}' (expected json, pretty or compact)")
    })
}

fn parse_setting(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("setting '{input}' must be KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("setting '{input}' has an empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Dashboard => "dashboard",
        Command::Open(_) => "open",
        Command::Repo(_) => "repo",
        Command::Backup(_) => "backup",
        Command::Snapshot(_) => "snapshot",
        Command::Task(_) => "task",
        Command::Settings(_) => "settings",
        Command::Prefs(_) => "prefs",
    }
}
