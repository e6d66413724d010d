//! Application context wiring the shared services together.
//!
//! # Design
//! - The context is built explicitly at startup; preferences are read before
//!   it is returned, so the first render already uses the right theme and
//!   language.
//! - Every poll task spawned through [`AppContext::backup_poller`] is a child
//!   of the context's shutdown token; [`AppContext::dispose`] stops them all.

pub mod preferences;
pub mod routes;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::UiConfig;
use crate::core::in_flight::InFlight;
use crate::core::notify::{NotificationCenter, Severity};
use crate::core::poller::JobPoller;
use crate::core::refresh::{RefreshView, ViewRefresher};
use crate::core::theme::ThemeMode;
use crate::error::{ClientResult, PreferencesError};
use crate::i18n::{LocaleCode, TranslationBundle};
use crate::services::api::{ApiClient, BackupJobs};

use self::preferences::{Preferences, SystemHints};

/// Shared state for one front-end session.
#[derive(Debug)]
pub struct AppContext {
    config: UiConfig,
    api: ApiClient,
    notifications: NotificationCenter,
    refresher: ViewRefresher,
    preferences: Preferences,
    theme: watch::Sender<ThemeMode>,
    bundle: RwLock<Arc<TranslationBundle>>,
    shutdown: CancellationToken,
}

impl AppContext {
    /// Load preferences from the configured state directory and build the context.
    ///
    /// # Errors
    ///
    /// Returns an error when the API URL is invalid or the HTTP client cannot be built.
    pub fn bootstrap(config: UiConfig, hints: &SystemHints) -> ClientResult<Self> {
        let preferences = Preferences::in_dir(config.preferences_dir().as_deref());
        Self::with_preferences(config, preferences, hints)
    }

    /// Build the context around an existing preference store.
    ///
    /// # Errors
    ///
    /// Returns an error when the API URL is invalid or the HTTP client cannot be built.
    pub fn with_preferences(
        config: UiConfig,
        preferences: Preferences,
        hints: &SystemHints,
    ) -> ClientResult<Self> {
        let theme = preferences.load_theme(hints);
        let locale = preferences.load_locale(hints);

        let notifications = NotificationCenter::new(config.notification_duration);
        let api = ApiClient::new(
            config.build_http_client()?,
            &config.api_url,
            InFlight::new(),
            notifications.clone(),
        )?;
        let (theme_tx, _) = watch::channel(theme);
        info!(
            api_url = %api.base_url(),
            theme = theme.as_str(),
            locale = locale.code(),
            "application context ready"
        );

        Ok(Self {
            config,
            api,
            notifications,
            refresher: ViewRefresher::default(),
            preferences,
            theme: theme_tx,
            bundle: RwLock::new(Arc::new(TranslationBundle::new(locale))),
            shutdown: CancellationToken::new(),
        })
    }

    /// Settings the context was built with.
    #[must_use]
    pub const fn config(&self) -> &UiConfig {
        &self.config
    }

    /// Request wrapper.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Notification center.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// In-flight request counter.
    #[must_use]
    pub const fn in_flight(&self) -> &InFlight {
        self.api.in_flight()
    }

    /// Refresh trigger for the mounted view.
    #[must_use]
    pub const fn refresher(&self) -> &ViewRefresher {
        &self.refresher
    }

    /// Preference store.
    #[must_use]
    pub const fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Active theme.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        *self.theme.borrow()
    }

    /// Observe theme changes.
    #[must_use]
    pub fn subscribe_theme(&self) -> watch::Receiver<ThemeMode> {
        self.theme.subscribe()
    }

    /// Apply and persist a theme. The theme is applied even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns an error when the preference cannot be written.
    pub fn set_theme(&self, mode: ThemeMode) -> Result<(), PreferencesError> {
        self.theme.send_replace(mode);
        self.preferences.persist_theme(mode)
    }

    /// Switch between light and dark, returning the new mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the preference cannot be written.
    pub fn toggle_theme(&self) -> Result<ThemeMode, PreferencesError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Translation bundle for the active language.
    #[must_use]
    pub fn bundle(&self) -> Arc<TranslationBundle> {
        Arc::clone(&self.bundle.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Active language.
    #[must_use]
    pub fn locale(&self) -> LocaleCode {
        self.bundle().locale
    }

    /// Switch and persist the interface language.
    ///
    /// # Errors
    ///
    /// Returns an error when the preference cannot be written.
    pub fn set_locale(&self, locale: LocaleCode) -> Result<(), PreferencesError> {
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(TranslationBundle::new(locale));
        self.preferences.persist_locale(locale)
    }

    /// Translate `path`.
    #[must_use]
    pub fn text(&self, path: &str, default: &str) -> String {
        self.bundle().text(path, default)
    }

    /// Translate `path` and substitute placeholders.
    #[must_use]
    pub fn format(&self, path: &str, default: &str, args: &[(&str, &str)]) -> String {
        self.bundle().format(path, default, args)
    }

    /// Make `view` the target of refreshes.
    pub fn mount(&self, view: Arc<dyn RefreshView>) {
        self.refresher.mount(view);
    }

    /// Run a mutation, announce success with the translated `key`, then refresh.
    ///
    /// # Errors
    ///
    /// Propagates the mutation's error.
    pub async fn mutate<T, F>(&self, action: F, key: &str, default: &str) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let message = self.text(key, default);
        self.refresher
            .after_mutation(&self.notifications, action, move |_| {
                (message, Severity::Success)
            })
            .await
    }

    /// Run a mutation whose announcement depends on its result, then refresh.
    ///
    /// # Errors
    ///
    /// Propagates the mutation's error.
    pub async fn mutate_with<T, F, D>(&self, action: F, describe: D) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
        D: FnOnce(&T) -> (String, Severity),
    {
        self.refresher
            .after_mutation(&self.notifications, action, describe)
            .await
    }

    /// Poller for backup runs, stopped by [`Self::dispose`].
    #[must_use]
    pub fn backup_poller(&self) -> JobPoller<BackupJobs> {
        JobPoller::new(
            BackupJobs::new(self.api.clone()),
            self.config.poll_interval,
            self.notifications.clone(),
            self.refresher.clone(),
            self.bundle(),
        )
        .with_parent(self.shutdown.child_token())
    }

    /// Stop every poll task and unmount the current view. Safe to call repeatedly.
    pub fn dispose(&self) {
        if !self.shutdown.is_cancelled() {
            info!("disposing application context");
        }
        self.shutdown.cancel();
        self.refresher.unmount();
    }

    /// Whether [`Self::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
