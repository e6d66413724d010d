//! Output renderers and formatting helpers for CLI commands.

use std::sync::Arc;

use anyhow::anyhow;
use colored::Colorize;
use resticly_api_models::{Backup, Repository, ScheduledTask, SettingsMap, Snapshot, SnapshotFile};
use resticly_ui::core::theme::{ColorToken, Palette};
use resticly_ui::format::{
    capitalize, elapsed_seconds, format_duration, format_optional_date, format_size,
    status_severity,
};
use resticly_ui::{AppContext, Severity, TranslationBundle};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const SHORT_ID_LEN: usize = 8;

/// Colour `text` with `token`; tokens that fail to decode leave the text plain.
pub(crate) fn paint(text: &str, token: ColorToken) -> String {
    token.rgb().map_or_else(
        || text.to_string(),
        |(red, green, blue)| text.truecolor(red, green, blue).to_string(),
    )
}

/// Print a rendered document to stdout.
pub(crate) fn print(rendered: serde_json::Result<String>) -> CliResult<()> {
    let text =
        rendered.map_err(|err| CliError::failure(anyhow!("failed to format output: {err}")))?;
    println!("{text}");
    Ok(())
}

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct DashboardSummary {
    pub(crate) repositories: usize,
    pub(crate) snapshots: usize,
    pub(crate) backups: usize,
    pub(crate) running: usize,
    pub(crate) completed: usize,
    pub(crate) failed: usize,
    pub(crate) tasks: usize,
    pub(crate) active_tasks: usize,
    pub(crate) bytes_added: u64,
    pub(crate) recent: Vec<Backup>,
}

/// Local preferences as shown by `prefs show`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct PreferenceSummary {
    pub(crate) theme: String,
    pub(crate) language: String,
    pub(crate) state_file: Option<String>,
}

struct Cell {
    text: String,
    tone: Option<Severity>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
        }
    }

    fn status(label: &str) -> Self {
        Self {
            text: label.to_string(),
            tone: status_severity(label),
        }
    }
}

/// Renders server collections for one invocation's language, theme and format.
#[derive(Clone)]
pub(crate) struct Renderer {
    format: OutputFormat,
    bundle: Arc<TranslationBundle>,
    palette: &'static Palette,
}

impl Renderer {
    pub(crate) fn new(ctx: &AppContext, format: OutputFormat) -> Self {
        Self {
            format,
            bundle: ctx.bundle(),
            palette: ctx.theme().palette(),
        }
    }

    pub(crate) fn repositories(&self, list: &[Repository]) -> serde_json::Result<String> {
        self.collection(list, ("empty.repositories", "No repositories configured"), |renderer| {
            let headers = renderer.headers(&[
                ("id", "ID"),
                ("name", "Name"),
                ("type", "Type"),
                ("location", "Location"),
                ("status", "Status"),
                ("last_check", "Last check"),
            ]);
            let rows = list
                .iter()
                .map(|repo| {
                    vec![
                        Cell::plain(repo.id.to_string()),
                        Cell::plain(repo.name.clone()),
                        Cell::plain(repo.repo_type.as_str()),
                        Cell::plain(repo.location.clone()),
                        Cell::status(&repo.status),
                        Cell::plain(format_optional_date(repo.last_check.as_deref())),
                    ]
                })
                .collect();
            renderer.table(&headers, rows)
        })
    }

    pub(crate) fn repository(&self, repo: &Repository) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(repo);
        }
        let pairs = vec![
            (self.column("id", "ID"), Cell::plain(repo.id.to_string())),
            (self.column("name", "Name"), Cell::plain(repo.name.clone())),
            (self.column("type", "Type"), Cell::plain(repo.repo_type.as_str())),
            (
                self.column("location", "Location"),
                Cell::plain(repo.location.clone()),
            ),
            (self.column("status", "Status"), Cell::status(&repo.status)),
            (
                self.column("created", "Created"),
                Cell::plain(format_optional_date(repo.created_at.as_deref())),
            ),
            (
                self.column("last_check", "Last check"),
                Cell::plain(format_optional_date(repo.last_check.as_deref())),
            ),
        ];
        Ok(self.details(pairs))
    }

    pub(crate) fn backups(&self, list: &[Backup]) -> serde_json::Result<String> {
        self.collection(list, ("empty.backups", "No backups found"), |renderer| {
            renderer.backup_table(list)
        })
    }

    pub(crate) fn backup(&self, backup: &Backup) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(backup);
        }
        let mut pairs = vec![
            (self.column("id", "ID"), Cell::plain(backup.id.to_string())),
            (
                self.column("repository", "Repository"),
                Cell::plain(repository_label(backup.repository_name.as_deref(), backup.repository_id)),
            ),
            (
                self.column("source", "Source"),
                Cell::plain(backup.source_path.clone()),
            ),
            (
                self.column("status", "Status"),
                Cell::status(backup.status.as_str()),
            ),
            (
                self.column("started", "Started"),
                Cell::plain(format_optional_date(backup.start_time.as_deref())),
            ),
            (
                self.column("finished", "Finished"),
                Cell::plain(format_optional_date(backup.end_time.as_deref())),
            ),
            (
                self.column("duration", "Duration"),
                Cell::plain(backup_duration(backup)),
            ),
            (
                self.column("added", "Added"),
                Cell::plain(format_size(backup.bytes_added)),
            ),
            (self.column("files", "Files"), Cell::plain(file_counts(backup))),
        ];
        if let Some(snapshot) = &backup.snapshot_id {
            pairs.push((self.column("snapshot", "Snapshot"), Cell::plain(snapshot.clone())));
        }
        if let Some(message) = &backup.message {
            pairs.push((self.column("message", "Message"), Cell::plain(message.clone())));
        }
        Ok(self.details(pairs))
    }

    pub(crate) fn snapshots(&self, list: &[Snapshot]) -> serde_json::Result<String> {
        self.collection(list, ("empty.snapshots", "No snapshots found"), |renderer| {
            let headers = renderer.headers(&[
                ("snapshot", "Snapshot"),
                ("repository", "Repository"),
                ("created", "Created"),
                ("host", "Host"),
                ("paths", "Paths"),
                ("tags", "Tags"),
                ("size", "Size"),
            ]);
            let rows = list
                .iter()
                .map(|snapshot| {
                    vec![
                        Cell::plain(short_id(&snapshot.snapshot_id)),
                        Cell::plain(repository_label(
                            snapshot.repository_name.as_deref(),
                            snapshot.repository_id,
                        )),
                        Cell::plain(format_optional_date(snapshot.created_at.as_deref())),
                        Cell::plain(snapshot.hostname.clone().unwrap_or_default()),
                        Cell::plain(snapshot.paths.join(", ")),
                        Cell::plain(snapshot.tags.join(", ")),
                        Cell::plain(snapshot.size.map(format_size).unwrap_or_default()),
                    ]
                })
                .collect();
            renderer.table(&headers, rows)
        })
    }

    pub(crate) fn snapshot_files(&self, files: &[SnapshotFile]) -> serde_json::Result<String> {
        self.collection(files, ("empty.files", "Snapshot contains no files"), |renderer| {
            let headers = renderer.headers(&[
                ("type", "Type"),
                ("path", "Path"),
                ("size", "Size"),
                ("modified", "Modified"),
            ]);
            let rows = files
                .iter()
                .map(|file| {
                    vec![
                        Cell::plain(file.kind.clone().unwrap_or_default()),
                        Cell::plain(
                            file.path
                                .clone()
                                .or_else(|| file.name.clone())
                                .unwrap_or_default(),
                        ),
                        Cell::plain(file.size.map(format_size).unwrap_or_default()),
                        Cell::plain(format_optional_date(file.mtime.as_deref())),
                    ]
                })
                .collect();
            renderer.table(&headers, rows)
        })
    }

    pub(crate) fn tasks(&self, list: &[ScheduledTask]) -> serde_json::Result<String> {
        self.collection(list, ("empty.tasks", "No scheduled tasks"), |renderer| {
            let headers = renderer.headers(&[
                ("id", "ID"),
                ("name", "Name"),
                ("repository", "Repository"),
                ("schedule", "Schedule"),
                ("enabled", "Enabled"),
                ("last_run", "Last run"),
                ("next_run", "Next run"),
            ]);
            let rows = list
                .iter()
                .map(|task| {
                    let enabled = if task.enabled {
                        Cell {
                            text: renderer.bundle.text("status.yes", "yes"),
                            tone: Some(Severity::Success),
                        }
                    } else {
                        Cell::plain(renderer.bundle.text("status.no", "no"))
                    };
                    vec![
                        Cell::plain(task.id.to_string()),
                        Cell::plain(task.name.clone()),
                        Cell::plain(repository_label(
                            task.repository_name.as_deref(),
                            task.repository_id,
                        )),
                        Cell::plain(renderer.schedule(task)),
                        enabled,
                        Cell::plain(format_optional_date(task.last_run.as_deref())),
                        Cell::plain(format_optional_date(task.next_run.as_deref())),
                    ]
                })
                .collect();
            renderer.table(&headers, rows)
        })
    }

    pub(crate) fn settings(&self, settings: &SettingsMap) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(settings);
        }
        if settings.is_empty() {
            return Ok(self.empty("empty.settings", "No settings stored"));
        }
        let headers = self.headers(&[("key", "Key"), ("value", "Value")]);
        let rows = settings
            .iter()
            .map(|(key, value)| {
                vec![
                    Cell::plain(key.clone()),
                    Cell::plain(value.clone().unwrap_or_default()),
                ]
            })
            .collect();
        Ok(self.table(&headers, rows))
    }

    pub(crate) fn dashboard(&self, summary: &DashboardSummary) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(summary);
        }
        let counts = vec![
            (
                self.bundle.text("dashboard.repositories", "Repositories"),
                Cell::plain(summary.repositories.to_string()),
            ),
            (
                self.bundle.text("dashboard.snapshots", "Snapshots"),
                Cell::plain(summary.snapshots.to_string()),
            ),
            (
                self.bundle.text("dashboard.backups", "Backups"),
                Cell::plain(format!(
                    "{} ({} running, {} completed, {} failed)",
                    summary.backups, summary.running, summary.completed, summary.failed
                )),
            ),
            (
                self.bundle.text("dashboard.tasks", "Scheduled tasks"),
                Cell::plain(summary.tasks.to_string()),
            ),
            (
                self.bundle.text("dashboard.active_tasks", "Active tasks"),
                Cell::plain(summary.active_tasks.to_string()),
            ),
            (
                self.bundle.text("dashboard.data_added", "Data added"),
                Cell::plain(format_size(summary.bytes_added)),
            ),
        ];
        let mut rendered = self.details(counts);
        rendered.push_str("\n\n");
        rendered.push_str(&self.bundle.text("dashboard.recent_backups", "Recent backups"));
        rendered.push('\n');
        if summary.recent.is_empty() {
            rendered.push_str(&self.empty("dashboard.no_backups", "No backups yet"));
        } else {
            rendered.push_str(&self.backup_table(&summary.recent));
        }
        Ok(rendered)
    }

    pub(crate) fn preferences(&self, summary: &PreferenceSummary) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(summary);
        }
        let mut pairs = vec![
            (
                self.bundle.text("prefs.theme", "Theme"),
                Cell::plain(capitalize(&summary.theme)),
            ),
            (
                self.bundle.text("prefs.language", "Language"),
                Cell::plain(summary.language.clone()),
            ),
        ];
        if let Some(path) = &summary.state_file {
            pairs.push((
                self.bundle.text("prefs.state_file", "Preferences file"),
                Cell::plain(path.clone()),
            ));
        }
        Ok(self.details(pairs))
    }

    fn collection<T: Serialize>(
        &self,
        items: &[T],
        empty: (&str, &str),
        table: impl FnOnce(&Self) -> String,
    ) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(items),
            OutputFormat::Table if items.is_empty() => Ok(self.empty(empty.0, empty.1)),
            OutputFormat::Table => Ok(table(self)),
        }
    }

    fn backup_table(&self, list: &[Backup]) -> String {
        let headers = self.headers(&[
            ("id", "ID"),
            ("repository", "Repository"),
            ("source", "Source"),
            ("status", "Status"),
            ("started", "Started"),
            ("duration", "Duration"),
            ("added", "Added"),
        ]);
        let rows = list
            .iter()
            .map(|backup| {
                vec![
                    Cell::plain(backup.id.to_string()),
                    Cell::plain(repository_label(
                        backup.repository_name.as_deref(),
                        backup.repository_id,
                    )),
                    Cell::plain(backup.source_path.clone()),
                    Cell::status(backup.status.as_str()),
                    Cell::plain(format_optional_date(backup.start_time.as_deref())),
                    Cell::plain(backup_duration(backup)),
                    Cell::plain(format_size(backup.bytes_added)),
                ]
            })
            .collect();
        self.table(&headers, rows)
    }

    fn schedule(&self, task: &ScheduledTask) -> String {
        match (&task.cron_expression, task.interval_seconds) {
            (Some(expression), _) => expression.clone(),
            (None, Some(seconds)) => {
                let seconds = seconds.to_string();
                self.bundle
                    .format("tasks.every", "every {seconds}s", &[("seconds", seconds.as_str())])
            }
            (None, None) => task.schedule_type.as_str().to_string(),
        }
    }

    fn column(&self, key: &str, default: &str) -> String {
        self.bundle.text(&format!("columns.{key}"), default)
    }

    fn headers(&self, columns: &[(&str, &str)]) -> Vec<String> {
        columns
            .iter()
            .map(|(key, default)| self.column(key, default).to_uppercase())
            .collect()
    }

    fn empty(&self, key: &str, default: &str) -> String {
        paint(&self.bundle.text(key, default), self.palette.muted)
    }

    fn tone(&self, cell: &Cell, padded: &str) -> String {
        cell.tone.map_or_else(
            || padded.to_string(),
            |severity| paint(padded, self.palette.severity(severity)),
        )
    }

    fn table(&self, headers: &[String], rows: Vec<Vec<Cell>>) -> String {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.text.chars().count());
            }
        }
        let last = widths.len().saturating_sub(1);

        let mut lines = Vec::with_capacity(rows.len() + 1);
        let header_line: Vec<String> = headers
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(index, (header, width))| pad(header, *width, index == last))
            .collect();
        lines.push(header_line.join("  "));
        for row in &rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(index, (cell, width))| self.tone(cell, &pad(&cell.text, *width, index == last)))
                .collect();
            lines.push(line.join("  "));
        }
        lines.join("\n")
    }

    fn details(&self, pairs: Vec<(String, Cell)>) -> String {
        let width = pairs
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or_default();
        pairs
            .iter()
            .map(|(label, cell)| {
                format!("{}  {}", pad(&format!("{label}:"), width + 1, false), self.tone(cell, &cell.text))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn pad(text: &str, width: usize, last: bool) -> String {
    if last {
        return text.to_string();
    }
    let fill = width.saturating_sub(text.chars().count());
    format!("{text}{}", " ".repeat(fill))
}

pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

fn repository_label(name: Option<&str>, id: i64) -> String {
    name.map_or_else(|| format!("#{id}"), ToString::to_string)
}

fn backup_duration(backup: &Backup) -> String {
    match (&backup.start_time, &backup.end_time) {
        (Some(start), Some(end)) => elapsed_seconds(start, end)
            .map(format_duration)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn file_counts(backup: &Backup) -> String {
    format!("+{} ~{}", backup.files_new, backup.files_changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use resticly_api_models::{BackupStatus, RepositoryKind, ScheduleKind};
    use resticly_ui::core::theme::LIGHT;
    use resticly_ui::LocaleCode;

    fn renderer(format: OutputFormat, locale: LocaleCode) -> Renderer {
        colored::control::set_override(false);
        Renderer {
            format,
            bundle: Arc::new(TranslationBundle::new(locale)),
            palette: &LIGHT,
        }
    }

    fn backup(id: i64, status: BackupStatus) -> Backup {
        Backup {
            id,
            repository_id: 1,
            repository_name: Some("nas".into()),
            source_path: "/srv/data".into(),
            start_time: Some("2024-03-01T10:00:00".into()),
            end_time: Some("2024-03-01T11:02:05".into()),
            status,
            message: None,
            files_new: 12,
            files_changed: 3,
            bytes_added: 1536,
            snapshot_id: Some("1a2b3c4d5e6f".into()),
        }
    }

    #[test]
    fn backup_table_aligns_columns_and_formats_values() {
        let rendered = renderer(OutputFormat::Table, LocaleCode::En)
            .backups(&[backup(7, BackupStatus::Completed)])
            .unwrap_or_default();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID  REPOSITORY"));
        assert!(lines[1].contains("completed"));
        assert!(lines[1].contains("1h 2m 5s"));
        assert!(lines[1].ends_with("1.50 KB"));
        assert_eq!(lines[0].find("SOURCE"), lines[1].find("/srv/data"));
    }

    #[test]
    fn empty_collections_render_translated_placeholder() {
        let english = renderer(OutputFormat::Table, LocaleCode::En);
        assert_eq!(english.tasks(&[]).unwrap_or_default(), "No scheduled tasks");
        let chinese = renderer(OutputFormat::Table, LocaleCode::Zh);
        assert_ne!(chinese.tasks(&[]).unwrap_or_default(), "No scheduled tasks");
    }

    #[test]
    fn json_output_is_the_raw_collection() -> Result<()> {
        let repo = Repository {
            id: 1,
            name: "nas".into(),
            repo_type: RepositoryKind::RestServer,
            location: "https://nas.lan:8000/".into(),
            created_at: None,
            last_check: None,
            status: "ok".into(),
            rest_user: None,
        };
        let rendered = renderer(OutputFormat::Json, LocaleCode::En).repositories(&[repo])?;
        let parsed: serde_json::Value = serde_json::from_str(&rendered)?;
        assert_eq!(parsed[0]["repo_type"], "rest-server");
        assert_eq!(parsed[0]["status"], "ok");
        Ok(())
    }

    #[test]
    fn interval_tasks_describe_their_period() {
        let task = ScheduledTask {
            id: 2,
            repository_id: 1,
            repository_name: None,
            name: "nightly".into(),
            source_path: Some("/srv".into()),
            schedule_type: ScheduleKind::Interval,
            cron_expression: None,
            interval_seconds: Some(3600),
            enabled: false,
            last_run: None,
            next_run: None,
            created_at: None,
            tags: Vec::new(),
        };
        let rendered = renderer(OutputFormat::Table, LocaleCode::En)
            .tasks(&[task])
            .unwrap_or_default();
        assert!(rendered.contains("every 3600s"));
        assert!(rendered.contains("#1"));
        assert!(rendered.contains("no"));
    }

    #[test]
    fn dashboard_lists_counts_then_recent_backups() {
        let summary = DashboardSummary {
            repositories: 2,
            snapshots: 5,
            backups: 1,
            running: 0,
            completed: 1,
            failed: 0,
            tasks: 1,
            active_tasks: 1,
            bytes_added: 1536,
            recent: vec![backup(7, BackupStatus::Completed)],
        };
        let rendered = renderer(OutputFormat::Table, LocaleCode::En)
            .dashboard(&summary)
            .unwrap_or_default();
        assert!(rendered.starts_with("Repositories:"));
        assert!(rendered.contains("1 (0 running, 1 completed, 0 failed)"));
        assert!(rendered.contains("Recent backups\nID"));
    }

    #[test]
    fn short_ids_keep_eight_characters() {
        assert_eq!(short_id("1a2b3c4d5e6f"), "1a2b3c4d");
        assert_eq!(short_id("abc"), "abc");
    }
}
