use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "metric_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Weight,
    #[serde(alias = "fat")]
    BodyFat,
}

impl Metric {
    /// Collection name the metric lives under, per user.
    pub fn collection(self) -> &'static str {
        match self {
            Metric::Weight => "weight_progress",
            Metric::BodyFat => "fat_progress",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Weight => "kg",
            Metric::BodyFat => "%",
        }
    }

    /// Values the logging form accepts for this metric.
    pub fn accepted_range(self) -> RangeInclusive<f64> {
        match self {
            Metric::Weight => 30.0..=250.0,
            Metric::BodyFat => 5.0..=35.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Weight => write!(f, "weight"),
            Metric::BodyFat => write!(f, "body_fat"),
        }
    }
}

/// A logged observation as the store holds it.
///
/// `captured_at` is the wall-clock instant the user picked when logging. Records
/// written before that field existed leave it empty and carry the instant inside
/// `id` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MeasurementRecord {
    pub id: String,
    pub value: f64,
    pub captured_at: Option<NaiveDateTime>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// How the identifier of a new measurement is chosen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    /// Server-assigned id, capture instant stored explicitly.
    #[default]
    Generated,
    /// Capture instant encoded into the id, no explicit timestamp field.
    Legacy,
}

/// Encode a capture instant in the legacy identifier layout,
/// e.g. `2024-03-02T14_30_00-000`.
pub fn legacy_id(captured_at: NaiveDateTime) -> String {
    captured_at.format("%Y-%m-%dT%H_%M_00-000").to_string()
}
