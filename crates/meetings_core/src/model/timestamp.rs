//! Epoch-millisecond timestamps and date coercion.
//!
//! # Responsibility
//! - Provide the clock used for system timestamps.
//! - Coerce caller-provided date text into epoch milliseconds.
//!
//! # Invariants
//! - Naive date/time inputs are interpreted as UTC.
//! - Coercion never panics; unsupported input yields `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> EpochMillis {
    Utc::now().timestamp_millis()
}

/// Coerces date text into epoch milliseconds.
///
/// Accepted shapes:
/// - bare four-digit year (`2024`, January 1st midnight UTC)
/// - other integer text as epoch milliseconds (`1717243200000`)
/// - RFC 3339 (`2024-06-01T12:00:00Z`, `2024-06-01T12:00:00+02:00`)
/// - naive date/time, seconds and fraction optional (`2024-06-01T12:00:00.250`)
/// - plain date (`2024-06-01`, midnight UTC)
pub fn coerce_timestamp(value: &str) -> Option<EpochMillis> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() == 4 && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return trimmed
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc().timestamp_millis());
    }

    if let Ok(millis) = trimmed.parse::<i64>() {
        return Some(millis);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }

    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::coerce_timestamp;

    const JUNE_FIRST_MS: i64 = 1_717_200_000_000;

    #[test]
    fn coerces_supported_shapes() {
        assert_eq!(coerce_timestamp("2024-06-01"), Some(JUNE_FIRST_MS));
        assert_eq!(coerce_timestamp("2024-06-01T00:00:00Z"), Some(JUNE_FIRST_MS));
        assert_eq!(
            coerce_timestamp("2024-06-01T02:00:00+02:00"),
            Some(JUNE_FIRST_MS)
        );
        assert_eq!(coerce_timestamp("2024-06-01T00:00:00.500"), Some(JUNE_FIRST_MS + 500));
        assert_eq!(coerce_timestamp("2024-06-01 00:01"), Some(JUNE_FIRST_MS + 60_000));
        assert_eq!(coerce_timestamp(" 1717200000000 "), Some(JUNE_FIRST_MS));
    }

    #[test]
    fn four_digit_text_is_a_year_not_millis() {
        assert_eq!(coerce_timestamp("2024"), Some(1_704_067_200_000));
        assert_eq!(coerce_timestamp(" 1970 "), Some(0));
        assert_eq!(coerce_timestamp("20240"), Some(20_240));
    }

    #[test]
    fn rejects_unparseable_text() {
        assert_eq!(coerce_timestamp(""), None);
        assert_eq!(coerce_timestamp("next tuesday"), None);
        assert_eq!(coerce_timestamp("2024-13-40"), None);
    }
}
