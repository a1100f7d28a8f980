use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Result, RosterError};

/// Parses a service timestamp.
///
/// Accepted shapes:
/// - `YYYY-MM-DD` (midnight)
/// - `YYYY-MM-DDTHH:MM`
/// - `YYYY-MM-DDTHH:MM:SS`
pub fn parse_service_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    let invalid = || RosterError::invalid(format!("malformed service timestamp: {raw:?}"));

    let (format, shape) = match raw.len() {
        10 => ("%Y-%m-%d", "dddd-dd-dd"),
        16 => ("%Y-%m-%dT%H:%M", "dddd-dd-ddTdd:dd"),
        19 => ("%Y-%m-%dT%H:%M:%S", "dddd-dd-ddTdd:dd:dd"),
        _ => return Err(invalid()),
    };
    if !matches_shape(raw, shape) {
        return Err(invalid());
    }

    if raw.len() == 10 {
        return NaiveDate::parse_from_str(raw, format)
            .map(|d| d.and_time(NaiveTime::MIN))
            .map_err(|_| invalid());
    }
    NaiveDateTime::parse_from_str(raw, format).map_err(|_| invalid())
}

/// Parses a calendar date, `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 || !matches_shape(raw, "dddd-dd-dd") {
        return Err(RosterError::invalid(format!("malformed date: {raw:?}")));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| RosterError::invalid(format!("malformed date: {raw:?}")))
}

// 'd' is any ASCII digit, every other byte must match literally
fn matches_shape(raw: &str, shape: &str) -> bool {
    raw.len() == shape.len()
        && raw.bytes().zip(shape.bytes()).all(|(c, s)| match s {
            b'd' => c.is_ascii_digit(),
            _ => c == s,
        })
}

/// `DD/MM/YYYY HH:MM`
pub fn format_service(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// `DD/MM/YYYY`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Midnight `days` days before `as_of`; the lower bound of the recent-history window.
pub fn window_start(as_of: NaiveDate, days: u32) -> NaiveDateTime {
    (as_of - Duration::days(i64::from(days))).and_time(NaiveTime::MIN)
}
