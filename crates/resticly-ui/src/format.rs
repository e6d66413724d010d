//! Display formatting for sizes, durations, timestamps and status labels.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

use crate::core::notify::Severity;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a byte count with two decimals in binary units (`1536` -> `1.50 KB`).
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut scale = 1_u64;
    while unit + 1 < SIZE_UNITS.len() && bytes / scale >= 1024 {
        scale *= 1024;
        unit += 1;
    }
    format!(
        "{:.2} {}",
        bytes_to_f64(bytes) / bytes_to_f64(scale),
        SIZE_UNITS[unit]
    )
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}

/// Render seconds as `1h 2m 5s`, omitting leading zero units.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining = seconds % 60;
    let mut rendered = String::new();
    if hours > 0 {
        rendered.push_str(&format!("{hours}h "));
    }
    if minutes > 0 || hours > 0 {
        rendered.push_str(&format!("{minutes}m "));
    }
    rendered.push_str(&format!("{remaining}s"));
    rendered
}

/// Parse a server timestamp. Offset-less values are treated as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(trimmed, pattern).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Render a server timestamp in local time; unparseable input is returned unchanged.
#[must_use]
pub fn format_date(raw: &str) -> String {
    format_date_in(raw, &Local)
}

/// Render a server timestamp in `zone`.
#[must_use]
pub fn format_date_in<Tz>(raw: &str, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    parse_timestamp(raw).map_or_else(
        || raw.trim().to_string(),
        |parsed| parsed.with_timezone(zone).format(DISPLAY_FORMAT).to_string(),
    )
}

/// Render an optional timestamp, empty when absent.
#[must_use]
pub fn format_optional_date(raw: Option<&str>) -> String {
    raw.map(format_date).unwrap_or_default()
}

/// Whole seconds between two server timestamps.
#[must_use]
pub fn elapsed_seconds(start: &str, end: &str) -> Option<u64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    u64::try_from((end - start).num_seconds()).ok()
}

/// Severity used to colour a status badge; `None` renders neutral.
#[must_use]
pub fn status_severity(status: &str) -> Option<Severity> {
    match status.trim().to_ascii_lowercase().as_str() {
        "ok" | "completed" | "success" => Some(Severity::Success),
        "running" | "pending" => Some(Severity::Info),
        "error" | "failed" => Some(Severity::Danger),
        "warning" => Some(Severity::Warning),
        _ => None,
    }
}

/// Upper-case the first character.
#[must_use]
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units_with_two_decimals() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024_u64.pow(4)), "3.00 TB");
        assert_eq!(format_size(2048 * 1024_u64.pow(5)), "2048.00 PB");
    }

    #[test]
    fn durations_skip_leading_zero_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
        assert_eq!(format_duration(3600), "1h 0m 0s");
    }

    #[test]
    fn naive_timestamps_are_utc() {
        assert_eq!(
            format_date_in("2024-03-01T10:00:00.123456", &Utc),
            "2024-03-01 10:00:00"
        );
        assert_eq!(
            format_date_in("2024-03-01T12:00:00+02:00", &Utc),
            "2024-03-01 10:00:00"
        );
        assert_eq!(format_date_in("yesterday", &Utc), "yesterday");
        assert_eq!(format_optional_date(None), "");
    }

    #[test]
    fn elapsed_seconds_between_timestamps() {
        assert_eq!(
            elapsed_seconds("2024-03-01T10:00:00", "2024-03-01T11:02:05"),
            Some(3725)
        );
        assert_eq!(
            elapsed_seconds("2024-03-01T11:00:00", "2024-03-01T10:00:00"),
            None
        );
    }

    #[test]
    fn status_labels_map_to_severity() {
        assert_eq!(status_severity("OK"), Some(Severity::Success));
        assert_eq!(status_severity("completed"), Some(Severity::Success));
        assert_eq!(status_severity("pending"), Some(Severity::Info));
        assert_eq!(status_severity("failed"), Some(Severity::Danger));
        assert_eq!(status_severity("warning"), Some(Severity::Warning));
        assert_eq!(status_severity("unknown"), None);
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("completed"), "Completed");
        assert_eq!(capitalize(""), "");
    }
}
