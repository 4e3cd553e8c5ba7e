// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and week alignment.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Monday of the calendar week containing `date`.
pub fn week_start_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a Garmin activity start timestamp into a calendar date.
///
/// Garmin records carry timestamps in a few shapes depending on the
/// endpoint: RFC3339 (`2024-01-15T10:30:00.000Z`), a space-separated
/// local form (`2024-01-15 10:30:00`), or the T-separated form without
/// an offset. Returns `None` for anything unrecognizable.
pub fn parse_activity_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_monday_is_identity_for_monday() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(week_start_monday(monday), monday);
    }

    #[test]
    fn test_week_start_monday_rolls_back_sunday() {
        // Sunday 2024-01-21 belongs to the week starting Monday 2024-01-15
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        assert_eq!(
            week_start_monday(sunday),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_week_start_monday_crosses_month_boundary() {
        // Saturday 2024-02-03 belongs to the week starting Monday 2024-01-29
        let saturday = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        assert_eq!(
            week_start_monday(saturday),
            NaiveDate::from_ymd_opt(2024, 1, 29).unwrap()
        );
    }

    #[test]
    fn test_parse_activity_date_rfc3339() {
        assert_eq!(
            parse_activity_date("2024-01-15T10:30:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_parse_activity_date_garmin_local_format() {
        assert_eq!(
            parse_activity_date("2024-01-15 10:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_parse_activity_date_naive_t_format() {
        assert_eq!(
            parse_activity_date("2024-01-15T10:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_parse_activity_date_rejects_garbage() {
        assert_eq!(parse_activity_date("not a date"), None);
        assert_eq!(parse_activity_date(""), None);
    }
}
