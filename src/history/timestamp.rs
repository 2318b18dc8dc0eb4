//! Capture-instant resolution across the two record layouts.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::measurement::MeasurementRecord;

/// Where a record's capture instant came from, decided once when the record is
/// read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureInstant {
    /// The record carries an explicit `captured_at`.
    Explicit(NaiveDateTime),
    /// Parsed from an identifier like `2024-03-02T14_30_00-000`.
    LegacyEncoded(NaiveDateTime),
    /// Neither source yields an instant. The record is counted but never plotted.
    Unresolvable,
}

impl CaptureInstant {
    pub fn of(record: &MeasurementRecord) -> Self {
        if let Some(at) = record.captured_at {
            return CaptureInstant::Explicit(at);
        }
        match parse_legacy_id(&record.id) {
            Some(at) => CaptureInstant::LegacyEncoded(at),
            None => CaptureInstant::Unresolvable,
        }
    }

    pub fn instant(self) -> Option<NaiveDateTime> {
        match self {
            CaptureInstant::Explicit(at) | CaptureInstant::LegacyEncoded(at) => Some(at),
            CaptureInstant::Unresolvable => None,
        }
    }
}

fn legacy_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Hour and minute are underscore-delimited because ':' is not path-safe in ids.
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2})T(\d{2})_(\d{2})_").expect("legacy id pattern is valid")
    })
}

/// Wall-clock instant encoded in a legacy identifier, seconds dropped.
pub fn parse_legacy_id(id: &str) -> Option<NaiveDateTime> {
    let caps = legacy_pattern().captures(id)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let hour: u32 = caps[2].parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    date.and_hms_opt(hour, minute, 0)
}

/// Chart label such as `Mar 02, 14:30`. Built from the stored wall-clock
/// fields; month names are always English abbreviations.
pub fn chart_label(at: NaiveDateTime) -> String {
    at.format("%b %d, %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, captured_at: Option<NaiveDateTime>) -> MeasurementRecord {
        MeasurementRecord {
            id: id.into(),
            value: 80.0,
            captured_at,
            recorded_at: None,
        }
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_legacy_id_resolves_to_wall_clock() {
        assert_eq!(
            parse_legacy_id("2024-03-02T14_30_00-000"),
            Some(dt(2024, 3, 2, 14, 30))
        );
    }

    #[test]
    fn test_legacy_id_rejects_impossible_dates() {
        assert_eq!(parse_legacy_id("2024-13-02T14_30_00-000"), None);
        assert_eq!(parse_legacy_id("2024-02-30T14_30_00-000"), None);
        assert_eq!(parse_legacy_id("2024-03-02T25_30_00-000"), None);
    }

    #[test]
    fn test_legacy_id_requires_underscore_layout() {
        assert_eq!(parse_legacy_id("2024-03-02T14:30:00"), None);
        assert_eq!(parse_legacy_id("a1b2c3d4"), None);
        assert_eq!(parse_legacy_id("x2024-03-02T14_30_00-000"), None);
    }

    #[test]
    fn test_explicit_timestamp_wins_over_id() {
        let explicit = dt(2024, 5, 1, 7, 0);
        let r = record("2024-03-02T14_30_00-000", Some(explicit));
        assert_eq!(CaptureInstant::of(&r), CaptureInstant::Explicit(explicit));
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            CaptureInstant::of(&record("2024-03-02T14_30_00-000", None)),
            CaptureInstant::LegacyEncoded(dt(2024, 3, 2, 14, 30))
        );
        let unknown = CaptureInstant::of(&record("6f1c9a", None));
        assert_eq!(unknown, CaptureInstant::Unresolvable);
        assert_eq!(unknown.instant(), None);
    }

    #[test]
    fn test_chart_label_format() {
        assert_eq!(chart_label(dt(2024, 3, 2, 14, 30)), "Mar 02, 14:30");
        assert_eq!(chart_label(dt(2023, 12, 31, 0, 5)), "Dec 31, 00:05");
    }
}
