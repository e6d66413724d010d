#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
//! Shared HTTP DTOs for the Resticly REST API.
//!
//! These types mirror the JSON documents served under `/api/*`. Timestamps are
//! kept as the server renders them (ISO-8601, with or without an offset) and
//! parsed only when formatted for display, so an unexpected server clock format
//! never breaks decoding of a whole list.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error document returned on every non-2xx response.
///
/// The `error` field is optional on the wire: proxies and crashed handlers may
/// answer with arbitrary JSON (or none at all).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Failure message. Usually a string, but any JSON value is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ErrorBody {
    /// Message carried by `error`, or `None` when it is missing or falsy
    /// (`""`, `0`, `false`, `null`).
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) if text.is_empty() => None,
            Value::String(text) => Some(text.clone()),
            Value::Number(number) if number.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

/// Generic acknowledgement returned by delete, restore, forget and sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    /// Whether the server completed the action.
    #[serde(default)]
    pub success: bool,
    /// Optional engine output or explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of affected records (snapshot sync).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Storage backend kinds accepted by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RepositoryKind {
    /// Local filesystem path.
    #[serde(rename = "local")]
    Local,
    /// restic REST server.
    #[serde(rename = "rest-server")]
    RestServer,
    /// SFTP target.
    #[serde(rename = "sftp")]
    Sftp,
    /// S3-compatible bucket.
    #[serde(rename = "s3")]
    S3,
}

impl RepositoryKind {
    /// Wire label for the repository kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RestServer => "rest-server",
            Self::Sftp => "sftp",
            Self::S3 => "s3",
        }
    }
}

/// Repository as listed by `GET /api/repositories`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Server-assigned identifier.
    pub id: i64,
    /// Unique display name.
    pub name: String,
    /// Backend kind.
    pub repo_type: RepositoryKind,
    /// Path or URL of the repository.
    pub location: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Timestamp of the last health check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
    /// Health label (`unknown`, `ok`, `error`).
    #[serde(default = "unknown_status")]
    pub status: String,
    /// REST server user, only populated for `rest-server` repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_user: Option<String>,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

/// Payload for `POST /api/repositories`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryCreateRequest {
    /// Unique display name.
    pub name: String,
    /// Backend kind.
    pub repo_type: RepositoryKind,
    /// Path or URL of the repository.
    pub location: String,
    /// Encryption password used to initialise the repository.
    pub password: String,
    /// REST server user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_user: Option<String>,
    /// REST server password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_pass: Option<String>,
}

/// Response of `POST /api/repositories/{id}/check`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryCheckResult {
    /// Health label after the check (`ok` or `error`).
    pub status: String,
    /// Engine output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Timestamp of the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
}

/// Lifecycle labels reported for a backup run.
///
/// Unrecognised labels decode as [`BackupStatus::Unknown`] so a newer server
/// never breaks list rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    /// Accepted but not started yet.
    Pending,
    /// Engine is running.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Any label this client does not know.
    #[serde(other)]
    Unknown,
}

impl BackupStatus {
    /// Wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Backup run as returned by `GET /api/backups` and `GET /api/backups/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backup {
    /// Server-assigned identifier; also the poll target.
    pub id: i64,
    /// Owning repository.
    pub repository_id: i64,
    /// Owning repository name (absent on the creation response).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    /// Source path being backed up.
    pub source_path: String,
    /// Start timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// End timestamp, set once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Current lifecycle label.
    pub status: BackupStatus,
    /// Failure or engine message, set once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// New files recorded by the run.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub files_new: u64,
    /// Changed files recorded by the run.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub files_changed: u64,
    /// Bytes added to the repository.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bytes_added: u64,
    /// Resulting restic snapshot identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload for `POST /api/backups`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupCreateRequest {
    /// Target repository.
    pub repository_id: i64,
    /// Source path to back up.
    pub source_path: String,
}

/// Restic snapshot mirrored by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Row identifier.
    pub id: i64,
    /// Owning repository.
    pub repository_id: i64,
    /// Owning repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    /// Restic snapshot identifier used in snapshot endpoints.
    pub snapshot_id: String,
    /// Snapshot creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Host that produced the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Backed-up paths.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Snapshot tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reported size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Snapshot {
    /// First eight characters of the restic identifier.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.snapshot_id
            .char_indices()
            .nth(8)
            .map_or(self.snapshot_id.as_str(), |(idx, _)| &self.snapshot_id[..idx])
    }
}

/// Entry of `GET /api/snapshots/{id}/files`.
///
/// The engine output is passed through verbatim, so every field is optional
/// and unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnapshotFile {
    /// Base name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entry type (`file`, `dir`, `symlink`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Absolute path inside the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<String>,
    /// Remaining engine fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Payload for `POST /api/snapshots/{id}/restore`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Destination directory on the server host.
    pub target_path: String,
    /// Restrict the restore to these paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_paths: Option<Vec<String>>,
}

/// Payload for `POST /api/snapshots/{id}/forget`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgetRequest {
    /// Prune unreferenced data after forgetting.
    #[serde(default)]
    pub prune: bool,
}

/// Scheduling mode of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Cron expression.
    Cron,
    /// Fixed interval in seconds.
    Interval,
}

impl ScheduleKind {
    /// Wire label for the schedule kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::Interval => "interval",
        }
    }
}

/// Scheduled backup task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Server-assigned identifier.
    pub id: i64,
    /// Target repository.
    pub repository_id: i64,
    /// Target repository name (list endpoint only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    /// Display name.
    pub name: String,
    /// Source path (list endpoint only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Scheduling mode.
    pub schedule_type: ScheduleKind,
    /// Cron expression for cron tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    /// Interval for interval tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    /// Whether the scheduler will run the task.
    pub enabled: bool,
    /// Last run timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
    /// Next planned run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<String>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Tags applied to the produced snapshots.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Payload for `POST /api/scheduled-tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTaskCreateRequest {
    /// Target repository.
    pub repository_id: i64,
    /// Display name.
    pub name: String,
    /// Source path to back up.
    pub source_path: String,
    /// Scheduling mode.
    pub schedule_type: ScheduleKind,
    /// Cron expression, required for cron tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    /// Interval, required for interval tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    /// Start enabled.
    pub enabled: bool,
    /// Snapshot tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Partial update for `PUT /api/scheduled-tasks/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTaskUpdate {
    /// Enable or disable the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New source path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// New scheduling mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<ScheduleKind>,
    /// New cron expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    /// New interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    /// Replacement tag list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Server-side application settings (`GET`/`POST /api/settings`).
pub type SettingsMap = BTreeMap<String, Option<String>>;
