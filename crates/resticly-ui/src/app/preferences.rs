//! Persisted user preferences and environment hints.
//!
//! Preferences live in a small JSON object on disk. A missing or corrupt file
//! behaves like an empty one; writes replace the file atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, warn};

use crate::core::theme::ThemeMode;
use crate::error::PreferencesError;
use crate::i18n::{DEFAULT_LOCALE, LocaleCode};

/// Storage key of the selected language.
pub const LANGUAGE_KEY: &str = "resticly_language";
/// Storage key of the selected theme.
pub const THEME_KEY: &str = "resticly_theme";
/// File name of the preference store inside the state directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Durable key-value storage.
pub trait PreferenceStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError>;

    /// Location shown to the user, if the storage is backed by a file.
    fn location(&self) -> Option<&Path> {
        None
    }
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local storage used when no state directory is available.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
}

impl PreferenceStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStorage {
    /// Open the store at `path`, starting empty when the file is missing or unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Entries>(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring corrupt preferences file");
                Entries::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read preferences file");
                Entries::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &Entries) -> Result<(), PreferencesError> {
        let write_error = |source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let raw = serde_json::to_vec_pretty(entries)
            .map_err(|source| PreferencesError::Serialize { source })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, raw).map_err(write_error)?;
        fs::rename(&staging, &self.path).map_err(write_error)
    }
}

impl PreferenceStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        let mut entries = lock(&self.entries);
        let mut staged = entries.clone();
        staged.insert(key.to_string(), value.to_string());
        self.persist(&staged)?;
        *entries = staged;
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Theme and language hints read from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemHints {
    /// Terminal colour scheme, if it could be inferred.
    pub theme: Option<ThemeMode>,
    /// Language tag such as `zh_CN.UTF-8`.
    pub language: Option<String>,
}

impl SystemHints {
    /// Read `COLORFGBG` and the locale variables (`LC_ALL`, `LC_MESSAGES`, `LANG`).
    #[must_use]
    pub fn detect() -> Self {
        let theme = std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| ThemeMode::from_colorfgbg(&value));
        let language = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty() && value != "C" && value != "POSIX");
        Self { theme, language }
    }
}

/// Typed access to the preference store.
#[derive(Clone)]
pub struct Preferences {
    storage: Arc<dyn PreferenceStorage>,
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("location", &self.storage.location())
            .finish()
    }
}

impl Preferences {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn PreferenceStorage>) -> Self {
        Self { storage }
    }

    /// File storage under `dir`, or memory storage when there is no directory.
    #[must_use]
    pub fn in_dir(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::new(Arc::new(FileStorage::open(dir.join(PREFERENCES_FILE)))),
            None => {
                warn!("no state directory available; preferences will not persist");
                Self::new(Arc::new(MemoryStorage::default()))
            }
        }
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.storage.location()
    }

    /// Theme stored by the user, if valid.
    #[must_use]
    pub fn stored_theme(&self) -> Option<ThemeMode> {
        self.storage
            .get(THEME_KEY)
            .and_then(|value| ThemeMode::parse(&value))
    }

    /// Effective theme: stored, then system, then light.
    #[must_use]
    pub fn load_theme(&self, hints: &SystemHints) -> ThemeMode {
        ThemeMode::resolve(self.storage.get(THEME_KEY).as_deref(), hints.theme)
    }

    /// Effective language: stored, then system tag, then English.
    #[must_use]
    pub fn load_locale(&self, hints: &SystemHints) -> LocaleCode {
        if let Some(locale) = self
            .storage
            .get(LANGUAGE_KEY)
            .and_then(|value| LocaleCode::from_lang_tag(&value))
        {
            return locale;
        }
        hints
            .language
            .as_deref()
            .map_or(DEFAULT_LOCALE, LocaleCode::from_system_tag)
    }

    /// Persist the theme choice.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub fn persist_theme(&self, mode: ThemeMode) -> Result<(), PreferencesError> {
        self.set(THEME_KEY, mode.as_str())
    }

    /// Persist the language choice.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written.
    pub fn persist_locale(&self, locale: LocaleCode) -> Result<(), PreferencesError> {
        self.set(LANGUAGE_KEY, locale.code())
    }

    fn set(&self, key: &'static str, value: &str) -> Result<(), PreferencesError> {
        self.storage.set(key, value).inspect_err(|err| {
            error!(key, error = %err, "storage operation failed");
        })
    }
}
