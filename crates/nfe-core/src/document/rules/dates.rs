//! Emission timestamp parsing and date formatting.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use super::patterns::UTC_OFFSET;

/// Parse an emission timestamp made of `format` followed by the fixed
/// `utc_offset` suffix (e.g. "2024-03-10T14:30:00-03:00").
///
/// The returned date is the local date in that offset. On failure the
/// error carries a human-readable reason.
pub fn parse_emission_timestamp(
    value: &str,
    format: &str,
    utc_offset: &str,
) -> Result<NaiveDate, String> {
    let value = value.trim();

    let Some(local) = value.strip_suffix(utc_offset) else {
        let suffix = value.get(value.len().saturating_sub(6)..).unwrap_or("");
        return Err(if UTC_OFFSET.is_match(suffix) {
            format!("unexpected UTC offset {}, expected {}", suffix, utc_offset)
        } else {
            format!("missing UTC offset {}", utc_offset)
        });
    };

    NaiveDateTime::parse_from_str(local, format)
        .map(|timestamp| timestamp.date())
        .map_err(|e| e.to_string())
}

/// Parse a date-only emission field (older layouts).
pub fn parse_emission_date(value: &str, format: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), format).map_err(|e| e.to_string())
}

/// Format a date with a chrono format string, falling back to ISO 8601
/// when the format is invalid.
pub fn format_date(date: NaiveDate, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_err() {
        return date.to_string();
    }
    out
}

/// Check that a chrono format string contains no invalid specifiers.
pub fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
