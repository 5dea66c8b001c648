//! Turns one CSV row into a [`ResponseEvent`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::RowRejection;
use crate::models::ResponseEvent;

pub const TIMESTAMP_COLUMN: &str = "created_at_est";
pub const AGENT_COLUMN: &str = "user_email";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// The two required cells of a row, already located by column.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    pub created_at: Option<&'a str>,
    pub user_email: Option<&'a str>,
}

pub fn normalize_row(row: RawRow<'_>, source_file: &str) -> Result<ResponseEvent, RowRejection> {
    let agent = row
        .user_email
        .and_then(non_null)
        .ok_or(RowRejection::MissingAgent)?;
    let raw_timestamp = row
        .created_at
        .and_then(non_null)
        .ok_or(RowRejection::MissingTimestamp)?;
    let timestamp =
        parse_timestamp(raw_timestamp).ok_or_else(|| RowRejection::InvalidTimestamp {
            value: raw_timestamp.to_string(),
        })?;

    Ok(ResponseEvent::new(agent, timestamp, source_file))
}

/// Parses the wall-clock part of a timestamp. Offsets are ignored, not
/// applied: exports already carry the target local time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

// Type inference in spreadsheet exports turns empty cells into a literal null.
fn non_null(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(trimmed)
    }
}
