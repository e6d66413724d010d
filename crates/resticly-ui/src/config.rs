//! Runtime settings for the UI core.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::core::notify::DEFAULT_NOTIFICATION_DURATION;
use crate::core::poller::DEFAULT_POLL_INTERVAL;
use crate::error::{ClientError, ClientResult};

/// Default API endpoint of a locally running Resticly server.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Header carrying the per-invocation trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Settings resolved by the front end before the context is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiConfig {
    /// Base URL of the Resticly API.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Delay between job status queries.
    pub poll_interval: Duration,
    /// Default on-screen time of a notification.
    pub notification_duration: Duration,
    /// Directory holding persisted preferences; `None` selects the platform default.
    pub state_dir: Option<PathBuf>,
    /// Identifier attached to every request as `x-request-id`.
    pub request_id: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            notification_duration: DEFAULT_NOTIFICATION_DURATION,
            state_dir: None,
            request_id: None,
        }
    }
}

impl UiConfig {
    /// Directory for persisted preferences.
    #[must_use]
    pub fn preferences_dir(&self) -> Option<PathBuf> {
        self.state_dir
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("resticly")))
    }

    /// Build the HTTP client shared by every request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] when the TLS backend cannot be initialised.
    pub fn build_http_client(&self) -> ClientResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Some(id) = self.request_id.as_deref()
            && let Ok(value) = HeaderValue::from_str(id)
        {
            headers.insert(HeaderName::from_static(HEADER_REQUEST_ID), value);
        }
        reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| ClientError::ClientBuild { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = UiConfig::default();
        assert_eq!(config.api_url, "http://127.0.0.1:5000");
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
        assert_eq!(config.notification_duration, Duration::from_millis(3000));
    }

    #[test]
    fn explicit_state_dir_wins() {
        let config = UiConfig {
            state_dir: Some(PathBuf::from("/tmp/resticly-state")),
            ..UiConfig::default()
        };
        assert_eq!(
            config.preferences_dir(),
            Some(PathBuf::from("/tmp/resticly-state"))
        );
    }

    #[tokio::test]
    async fn request_id_is_sent_with_every_request() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/settings")
                    .header(HEADER_REQUEST_ID, "trace-1");
                then.status(200).body("{}");
            })
            .await;

        let config = UiConfig {
            request_id: Some("trace-1".into()),
            ..UiConfig::default()
        };
        let client = config.build_http_client()?;
        client.get(server.url("/api/settings")).send().await?;
        mock.assert_async().await;
        Ok(())
    }
}
