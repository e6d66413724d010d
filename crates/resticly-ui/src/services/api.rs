//! REST client wrapping every call to the Resticly API.
//!
//! # Design
//! - [`ApiClient::request`] is the single entry point: it counts the request
//!   in [`InFlight`], folds every failure into [`ClientError::RequestFailed`],
//!   shows it as a danger notification and logs it before returning.
//! - Callers never see a raw transport or decode error.
//! - Typed endpoint helpers below are thin wrappers over `request`.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use resticly_api_models::{
    ActionResult, Backup, BackupCreateRequest, ErrorBody, ForgetRequest, Repository,
    RepositoryCheckResult, RepositoryCreateRequest, RestoreRequest, ScheduledTask,
    ScheduledTaskCreateRequest, ScheduledTaskUpdate, SettingsMap, Snapshot, SnapshotFile,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::core::in_flight::InFlight;
use crate::core::notify::NotificationCenter;
use crate::core::poller::JobProbe;
use crate::error::{ClientError, ClientResult, FailureKind};

#[derive(Clone, Debug)]
enum RequestBody {
    Json(Vec<u8>),
    Unencodable(String),
}

/// Method, body and headers of one request.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    method: Method,
    body: Option<RequestBody>,
    headers: Option<HeaderMap>,
}

impl RequestOptions {
    /// Options for an arbitrary method.
    #[must_use]
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// `GET` without a body.
    #[must_use]
    pub fn get() -> Self {
        Self::method(Method::GET)
    }

    /// `POST`.
    #[must_use]
    pub fn post() -> Self {
        Self::method(Method::POST)
    }

    /// `PUT`.
    #[must_use]
    pub fn put() -> Self {
        Self::method(Method::PUT)
    }

    /// `DELETE`.
    #[must_use]
    pub fn delete() -> Self {
        Self::method(Method::DELETE)
    }

    /// Attach a JSON body. Encoding failures surface when the request is sent.
    #[must_use]
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(match serde_json::to_vec(body) {
            Ok(bytes) => RequestBody::Json(bytes),
            Err(err) => RequestBody::Unencodable(format!("failed to encode request body: {err}")),
        });
        self
    }

    /// Replace the default headers entirely.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// HTTP client bound to one API base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    in_flight: InFlight,
    notifications: NotificationCenter,
}

impl ApiClient {
    /// Bind a client to `base_url`, sharing the given counter and notification center.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] when `base_url` is not absolute.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        in_flight: InFlight,
        notifications: NotificationCenter,
    ) -> ClientResult<Self> {
        let mut parsed = Url::parse(base_url).map_err(|source| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http,
            base_url: parsed,
            in_flight,
            notifications,
        })
    }

    /// Base URL every path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Counter shared with the loading indicator.
    #[must_use]
    pub const fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Send a request and decode its JSON response.
    ///
    /// A non-success status yields the server's `error` field as the message,
    /// or `HTTP error <status>` when there is none. Every failure is shown as a
    /// danger notification before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RequestFailed`] for endpoint, encode, transport,
    /// protocol and decode failures.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let _guard = self.in_flight.acquire();
        let method = options.method.clone();
        let result = self.send(path, options).await;
        match &result {
            Ok(_) => debug!(%method, path, "API request succeeded"),
            Err(err) => {
                warn!(%method, path, error = %err, "API request failed");
                self.notifications.danger(err.to_string());
            }
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let url = self.endpoint(path)?;
        let headers = options.headers.unwrap_or_else(json_headers);
        let mut builder = self.http.request(options.method, url).headers(headers);
        match options.body {
            Some(RequestBody::Json(bytes)) => builder = builder.body(bytes),
            Some(RequestBody::Unencodable(message)) => {
                return Err(ClientError::request_failed(FailureKind::Encode, message));
            }
            None => {}
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(protocol_error(status.as_u16(), &body));
        }
        decode_body(&body)
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| {
                ClientError::request_failed(
                    FailureKind::Endpoint,
                    format!("invalid endpoint '{path}': {err}"),
                )
            })
    }

    /// `GET /api/repositories`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn list_repositories(&self) -> ClientResult<Vec<Repository>> {
        self.request("api/repositories", RequestOptions::get()).await
    }

    /// `GET /api/repositories/{id}`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn get_repository(&self, id: i64) -> ClientResult<Repository> {
        self.request(&format!("api/repositories/{id}"), RequestOptions::get())
            .await
    }

    /// `POST /api/repositories`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn create_repository(
        &self,
        request: &RepositoryCreateRequest,
    ) -> ClientResult<Repository> {
        self.request("api/repositories", RequestOptions::post().json(request))
            .await
    }

    /// `POST /api/repositories/{id}/check`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn check_repository(&self, id: i64) -> ClientResult<RepositoryCheckResult> {
        self.request(
            &format!("api/repositories/{id}/check"),
            RequestOptions::post(),
        )
        .await
    }

    /// `DELETE /api/repositories/{id}`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn delete_repository(&self, id: i64) -> ClientResult<ActionResult> {
        self.request(&format!("api/repositories/{id}"), RequestOptions::delete())
            .await
    }

    /// `GET /api/backups`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn list_backups(&self) -> ClientResult<Vec<Backup>> {
        self.request("api/backups", RequestOptions::get()).await
    }

    /// `POST /api/backups`; the response carries the job id to poll.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn create_backup(&self, request: &BackupCreateRequest) -> ClientResult<Backup> {
        self.request("api/backups", RequestOptions::post().json(request))
            .await
    }

    /// `GET /api/backups/{id}`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn get_backup(&self, id: i64) -> ClientResult<Backup> {
        self.request(&format!("api/backups/{id}"), RequestOptions::get())
            .await
    }

    /// `GET /api/snapshots`, optionally filtered by repository.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn list_snapshots(&self, repository_id: Option<i64>) -> ClientResult<Vec<Snapshot>> {
        let path = repository_id.map_or_else(
            || "api/snapshots".to_string(),
            |id| format!("api/snapshots?repository_id={id}"),
        );
        self.request(&path, RequestOptions::get()).await
    }

    /// `GET /api/snapshots/{snapshot_id}/files`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn snapshot_files(&self, snapshot_id: &str) -> ClientResult<Vec<SnapshotFile>> {
        let listing: Value = self
            .request(
                &format!("api/snapshots/{snapshot_id}/files"),
                RequestOptions::get(),
            )
            .await?;
        Ok(snapshot_entries(listing))
    }

    /// `POST /api/snapshots/{snapshot_id}/restore`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn restore_snapshot(
        &self,
        snapshot_id: &str,
        request: &RestoreRequest,
    ) -> ClientResult<ActionResult> {
        self.request(
            &format!("api/snapshots/{snapshot_id}/restore"),
            RequestOptions::post().json(request),
        )
        .await
    }

    /// `POST /api/snapshots/{snapshot_id}/forget`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn forget_snapshot(
        &self,
        snapshot_id: &str,
        request: &ForgetRequest,
    ) -> ClientResult<ActionResult> {
        self.request(
            &format!("api/snapshots/{snapshot_id}/forget"),
            RequestOptions::post().json(request),
        )
        .await
    }

    /// `POST /api/repositories/{id}/snapshots/sync`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn sync_snapshots(&self, repository_id: i64) -> ClientResult<ActionResult> {
        self.request(
            &format!("api/repositories/{repository_id}/snapshots/sync"),
            RequestOptions::post(),
        )
        .await
    }

    /// `GET /api/scheduled-tasks`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn list_tasks(&self) -> ClientResult<Vec<ScheduledTask>> {
        self.request("api/scheduled-tasks", RequestOptions::get())
            .await
    }

    /// `POST /api/scheduled-tasks`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn create_task(
        &self,
        request: &ScheduledTaskCreateRequest,
    ) -> ClientResult<ScheduledTask> {
        self.request("api/scheduled-tasks", RequestOptions::post().json(request))
            .await
    }

    /// `PUT /api/scheduled-tasks/{id}`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn update_task(
        &self,
        id: i64,
        update: &ScheduledTaskUpdate,
    ) -> ClientResult<ScheduledTask> {
        self.request(
            &format!("api/scheduled-tasks/{id}"),
            RequestOptions::put().json(update),
        )
        .await
    }

    /// `DELETE /api/scheduled-tasks/{id}`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn delete_task(&self, id: i64) -> ClientResult<ActionResult> {
        self.request(
            &format!("api/scheduled-tasks/{id}"),
            RequestOptions::delete(),
        )
        .await
    }

    /// `GET /api/settings`.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn get_settings(&self) -> ClientResult<SettingsMap> {
        self.request("api/settings", RequestOptions::get()).await
    }

    /// `POST /api/settings`; keys not present are left untouched.
    ///
    /// # Errors
    ///
    /// Propagates request failures.
    pub async fn update_settings(&self, settings: &SettingsMap) -> ClientResult<ActionResult> {
        self.request("api/settings", RequestOptions::post().json(settings))
            .await
    }
}

/// Status probe for backup runs.
#[derive(Clone, Debug)]
pub struct BackupJobs {
    api: ApiClient,
}

impl BackupJobs {
    /// Probe backups through `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl JobProbe for BackupJobs {
    type Job = Backup;

    async fn probe(&self, id: i64) -> ClientResult<Backup> {
        self.api.get_backup(id).await
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::request_failed(FailureKind::Transport, err.to_string())
}

fn protocol_error(status: u16, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message())
        .unwrap_or_else(|| format!("HTTP error {status}"));
    ClientError::request_failed(FailureKind::Protocol { status }, message)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        // Empty bodies are `null`; acknowledgement structs fall back to their defaults.
        if let Ok(value) = serde_json::from_slice::<T>(b"null") {
            return Ok(value);
        }
        return decode_body(b"{}");
    }
    serde_json::from_slice(body).map_err(|err| {
        ClientError::request_failed(FailureKind::Decode, format!("invalid response body: {err}"))
    })
}

/// Flatten an engine listing into file entries, dropping the snapshot header.
fn snapshot_entries(listing: Value) -> Vec<SnapshotFile> {
    let items = match listing {
        Value::Array(items) => items,
        Value::Object(_) => vec![listing],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter(|item| item.get("struct_type").and_then(Value::as_str) != Some("snapshot"))
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}
