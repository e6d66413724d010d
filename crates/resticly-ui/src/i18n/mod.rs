//! Lightweight JSON-backed translations with per-locale bundles.

use std::sync::LazyLock;

use serde_json::Value;

/// Supported interface languages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LocaleCode {
    /// English.
    #[default]
    En,
    /// Chinese (Simplified).
    Zh,
}

impl LocaleCode {
    /// All supported locales in display order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::En, Self::Zh]
    }

    /// Two-letter code persisted in preferences.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// Human-friendly label for selectors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "中文",
        }
    }

    /// Map a language tag (`zh-CN`, `en_US.UTF-8`) to a supported locale.
    #[must_use]
    pub fn from_lang_tag(tag: &str) -> Option<Self> {
        let lowered = tag.trim().to_ascii_lowercase();
        let base = lowered
            .split(['-', '_', '.', '@'])
            .next()
            .unwrap_or_default();
        Self::all()
            .iter()
            .copied()
            .find(|locale| locale.code() == base)
    }

    /// Map a system language tag, treating every non-Chinese tag as English.
    #[must_use]
    pub fn from_system_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Self::Zh
        } else {
            Self::En
        }
    }
}

/// Default fallback locale.
pub const DEFAULT_LOCALE: LocaleCode = LocaleCode::En;

/// Translation bundle containing a parsed JSON tree for the locale.
#[derive(Clone, Debug)]
pub struct TranslationBundle {
    /// Locale backing this bundle.
    pub locale: LocaleCode,
    tree: Value,
}

impl PartialEq for TranslationBundle {
    fn eq(&self, other: &Self) -> bool {
        self.locale == other.locale
    }
}

impl TranslationBundle {
    /// Build a translation bundle for the given locale.
    ///
    /// Missing keys degrade to English strings, then to the caller default.
    #[must_use]
    pub fn new(locale: LocaleCode) -> Self {
        let tree: Value = serde_json::from_str(raw_locale(locale)).unwrap_or(Value::Null);
        Self { locale, tree }
    }

    /// Resolve a dotted path (`section.key`) with English fallback and caller default.
    #[must_use]
    pub fn text(&self, path: &str, default: &str) -> String {
        resolve(&self.tree, path)
            .or_else(|| resolve(&EN_FALLBACK.tree, path))
            .unwrap_or_else(|| default.to_string())
    }

    /// Resolve a path and substitute `{name}` placeholders.
    #[must_use]
    pub fn format(&self, path: &str, default: &str, args: &[(&str, &str)]) -> String {
        args.iter()
            .fold(self.text(path, default), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

static EN_FALLBACK: LazyLock<TranslationBundle> =
    LazyLock::new(|| TranslationBundle::new(LocaleCode::En));

fn resolve(tree: &Value, path: &str) -> Option<String> {
    let mut node = tree;
    for segment in path.split('.') {
        node = node.get(segment)?;
    }
    node.as_str().map(ToString::to_string)
}

const fn raw_locale(locale: LocaleCode) -> &'static str {
    match locale {
        LocaleCode::En => include_str!("../../i18n/en.json"),
        LocaleCode::Zh => include_str!("../../i18n/zh.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_default() {
        let bundle = TranslationBundle::new(LocaleCode::Zh);
        assert_eq!(bundle.text("nonexistent.key", "fallback"), "fallback");
    }

    #[test]
    fn bundles_load_all_locales() {
        for locale in LocaleCode::all() {
            let bundle = TranslationBundle::new(locale);
            assert_eq!(bundle.locale, locale);
            assert_eq!(bundle.text("meta.label", "?"), locale.label());
        }
    }

    #[test]
    fn chinese_bundle_translates_outcomes() {
        let bundle = TranslationBundle::new(LocaleCode::Zh);
        assert_eq!(bundle.text("jobs.backup.completed", "Backup completed"), "备份完成");
    }

    #[test]
    fn placeholders_are_substituted() {
        let bundle = TranslationBundle::new(LocaleCode::En);
        assert_eq!(
            bundle.format("snapshots.synced", "", &[("count", "4")]),
            "Successfully synced 4 snapshots"
        );
    }

    #[test]
    fn language_tags_map_to_locales() {
        assert_eq!(LocaleCode::from_lang_tag("zh-CN"), Some(LocaleCode::Zh));
        assert_eq!(LocaleCode::from_lang_tag("en_US.UTF-8"), Some(LocaleCode::En));
        assert_eq!(LocaleCode::from_lang_tag("fr"), None);
        assert_eq!(LocaleCode::from_system_tag("zh_TW.UTF-8"), LocaleCode::Zh);
        assert_eq!(LocaleCode::from_system_tag("de_DE"), LocaleCode::En);
    }
}
