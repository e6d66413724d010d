//! Theme modes and the severity palette each mode renders with.

use crate::core::notify::Severity;

/// A single color token with a stable name and hex value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorToken {
    /// Semantic identifier (e.g., "success").
    pub name: &'static str,
    /// Hex RGB value.
    pub hex: &'static str,
}

impl ColorToken {
    /// Decode the hex value into RGB components.
    #[must_use]
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let digits = self.hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };
        Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Tokens used to render status and notifications for one theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    /// Palette identifier.
    pub id: &'static str,
    /// Neutral information.
    pub info: ColorToken,
    /// Success feedback.
    pub success: ColorToken,
    /// Warning feedback.
    pub warning: ColorToken,
    /// Error feedback.
    pub danger: ColorToken,
    /// De-emphasised text such as unknown statuses and timestamps.
    pub muted: ColorToken,
}

impl Palette {
    /// Token for a notification severity.
    #[must_use]
    pub const fn severity(&self, severity: Severity) -> ColorToken {
        match severity {
            Severity::Info => self.info,
            Severity::Success => self.success,
            Severity::Warning => self.warning,
            Severity::Danger => self.danger,
        }
    }
}

/// Palette for light backgrounds.
pub const LIGHT: Palette = Palette {
    id: "light",
    info: ColorToken {
        name: "info",
        hex: "#0D6EFD",
    },
    success: ColorToken {
        name: "success",
        hex: "#198754",
    },
    warning: ColorToken {
        name: "warning",
        hex: "#B58105",
    },
    danger: ColorToken {
        name: "danger",
        hex: "#DC3545",
    },
    muted: ColorToken {
        name: "muted",
        hex: "#6C757D",
    },
};

/// Palette for dark backgrounds.
pub const DARK: Palette = Palette {
    id: "dark",
    info: ColorToken {
        name: "info",
        hex: "#6EA8FE",
    },
    success: ColorToken {
        name: "success",
        hex: "#75B798",
    },
    warning: ColorToken {
        name: "warning",
        hex: "#FFDA6A",
    },
    danger: ColorToken {
        name: "danger",
        hex: "#EA868F",
    },
    muted: ColorToken {
        name: "muted",
        hex: "#ADB5BD",
    },
};

/// Light or dark theme preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
    /// Light theme mode.
    #[default]
    Light,
    /// Dark theme mode.
    Dark,
}

impl ThemeMode {
    /// Identifier persisted in preferences.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a persisted or user-supplied identifier.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// The opposite mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Palette rendered for this mode.
    #[must_use]
    pub const fn palette(self) -> &'static Palette {
        match self {
            Self::Light => &LIGHT,
            Self::Dark => &DARK,
        }
    }

    /// Pick the effective mode: stored choice, then system preference, then light.
    #[must_use]
    pub fn resolve(stored: Option<&str>, system: Option<Self>) -> Self {
        stored
            .and_then(Self::parse)
            .or(system)
            .unwrap_or_default()
    }

    /// Infer a dark or light terminal from a `COLORFGBG` value such as `15;0`.
    #[must_use]
    pub fn from_colorfgbg(value: &str) -> Option<Self> {
        let background = value.rsplit(';').next()?.trim().parse::<u8>().ok()?;
        if background <= 6 || background == 8 {
            Some(Self::Dark)
        } else {
            Some(Self::Light)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_mode_round_trips_labels() {
        for mode in [ThemeMode::Light, ThemeMode::Dark] {
            assert_eq!(ThemeMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ThemeMode::parse(" Dark "), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::parse("sepia"), None);
        assert_eq!(ThemeMode::Light.toggled(), ThemeMode::Dark);
    }

    #[test]
    fn stored_choice_beats_system_preference() {
        assert_eq!(
            ThemeMode::resolve(Some("light"), Some(ThemeMode::Dark)),
            ThemeMode::Light
        );
        assert_eq!(ThemeMode::resolve(None, Some(ThemeMode::Dark)), ThemeMode::Dark);
        assert_eq!(
            ThemeMode::resolve(Some("garbage"), Some(ThemeMode::Dark)),
            ThemeMode::Dark
        );
        assert_eq!(ThemeMode::resolve(None, None), ThemeMode::Light);
    }

    #[test]
    fn colorfgbg_background_selects_mode() {
        assert_eq!(ThemeMode::from_colorfgbg("15;0"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::from_colorfgbg("0;15"), Some(ThemeMode::Light));
        assert_eq!(ThemeMode::from_colorfgbg("12;default;8"), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::from_colorfgbg("bogus"), None);
    }

    #[test]
    fn palette_tokens_decode_to_rgb() {
        for palette in [&LIGHT, &DARK] {
            for severity in [
                Severity::Info,
                Severity::Success,
                Severity::Warning,
                Severity::Danger,
            ] {
                assert!(palette.severity(severity).rgb().is_some());
            }
            assert!(palette.muted.rgb().is_some());
        }
        assert_eq!(LIGHT.danger.rgb(), Some((0xDC, 0x35, 0x45)));
    }
}
