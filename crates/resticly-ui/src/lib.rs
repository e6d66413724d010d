#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! Front-end core for Resticly.
//!
//! Layout:
//! - `core/`: in-flight counter, notifications, job poller, view refresh, theme.
//! - `services/`: REST client wrapping every API call.
//! - `app/`: application context, preferences and routes.
//! - `i18n/`: translation bundles.
//! - `format`: display helpers shared by renderers.

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod i18n;
pub mod services;

pub use app::AppContext;
pub use app::preferences::{Preferences, SystemHints};
pub use app::routes::{Page, Route, RouteTable};
pub use config::UiConfig;
pub use crate::core::notify::{Notification, NotificationCenter, NotificationEvent, Severity};
pub use crate::core::poller::{JobPhase, JobPoller, JobProbe, PollHandle, PollOutcome, PollState, TrackedJob};
pub use crate::core::refresh::{RefreshView, ViewRefresher};
pub use crate::core::theme::ThemeMode;
pub use error::{ClientError, ClientResult, FailureKind, PreferencesError};
pub use i18n::{LocaleCode, TranslationBundle};
pub use services::api::{ApiClient, BackupJobs, RequestOptions};
