//! # Request/Response DTOs
//!
//! Conventions:
//! - `*Request` / `*Query` → deserialized from client JSON body or query params
//! - `*Response` → serialized to client JSON
//! - Field-level validation is expressed via `validator` derive macros;
//!   rules that depend on other inputs (metric bounds, filter modes) live in
//!   the conversion helpers here

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::history::{HistoryFilter, HistorySnapshot, Preset};
use crate::models::calendar::{CalendarEvent, EventCategory};
use crate::models::measurement::{IdFormat, MeasurementRecord, Metric};
use crate::models::profile::{Gender, Profile, ProfilePatch};

// ============================================================================
// Common
// ============================================================================

/// Standard delete confirmation
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

// ============================================================================
// Measurements
// ============================================================================

/// GET /api/measurements/:metric/history
///
/// Either `range` (`7d`, `30d`, `all`, ...) or both `from` and `to`; neither
/// means `all`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct HistoryQuery {
    pub range: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[validate(range(min = 1, message = "max_points must be at least 1"))]
    pub max_points: Option<usize>,
}

impl HistoryQuery {
    pub fn filter(&self) -> AppResult<HistoryFilter> {
        match (&self.range, self.from, self.to) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(AppError::Validation(
                "Use either range or from/to, not both".into(),
            )),
            (Some(range), None, None) => Ok(HistoryFilter::Preset(range.parse::<Preset>()?)),
            (None, Some(from), Some(to)) => Ok(HistoryFilter::Interval { from, to }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(AppError::Validation(
                "from and to must be given together".into(),
            )),
            (None, None, None) => Ok(HistoryFilter::default()),
        }
    }

    /// Requested cap, clamped to the configured ceiling.
    pub fn max_points(&self, ceiling: usize) -> Option<usize> {
        self.max_points.map(|n| n.min(ceiling))
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// `"ok"` or `"empty"` (nothing to plot in the selected range).
    pub status: &'static str,
    pub filter: String,
    #[serde(flatten)]
    pub snapshot: HistorySnapshot,
}

impl HistoryResponse {
    pub fn new(filter: &HistoryFilter, snapshot: HistorySnapshot) -> Self {
        Self {
            status: if snapshot.is_empty() { "empty" } else { "ok" },
            filter: filter.to_string(),
            snapshot,
        }
    }
}

/// POST /api/measurements/:metric
#[derive(Debug, Deserialize)]
pub struct CreateMeasurementRequest {
    pub value: f64,
    /// Local wall-clock time of the measurement. Default: now.
    pub captured_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub id_format: IdFormat,
}

impl CreateMeasurementRequest {
    pub fn validate_for(&self, metric: Metric) -> AppResult<()> {
        let range = metric.accepted_range();
        if !self.value.is_finite() || !range.contains(&self.value) {
            return Err(AppError::Validation(format!(
                "{} must be between {} and {} {}",
                metric,
                range.start(),
                range.end(),
                metric.unit()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct MeasurementResponse {
    pub metric: Metric,
    #[serde(flatten)]
    pub record: MeasurementRecord,
}

// ============================================================================
// Calendar
// ============================================================================

/// GET /api/calendar?month=YYYY-MM
#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
}

/// POST /api/calendar
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    pub date: NaiveDate,

    /// Default: 12:00
    pub time: Option<NaiveTime>,

    #[serde(default)]
    pub category: EventCategory,
}

impl CreateEventRequest {
    pub fn starts_at(&self) -> NaiveDateTime {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        self.date.and_time(self.time.unwrap_or(noon))
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarMonthResponse {
    pub month: String,
    pub events: Vec<CalendarEvent>,
    /// Event count per day, for highlighting busy days.
    pub counts_by_day: BTreeMap<NaiveDate, usize>,
}

impl CalendarMonthResponse {
    pub fn new(month: String, events: Vec<CalendarEvent>) -> Self {
        let mut counts_by_day = BTreeMap::new();
        for event in &events {
            *counts_by_day.entry(event.starts_at.date()).or_insert(0) += 1;
        }
        Self {
            month,
            events,
            counts_by_day,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventDeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

// ============================================================================
// Profile
// ============================================================================

/// PATCH /api/profile; omitted fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(range(min = 1, max = 120, message = "Age must be between 1 and 120"))]
    pub age: Option<i32>,

    pub gender: Option<Gender>,

    /// Centimetres
    #[validate(range(min = 50, max = 250, message = "Height must be between 50 and 250 cm"))]
    pub height: Option<i32>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.age.is_none() && self.gender.is_none() && self.height.is_none()
    }

    pub fn into_patch(self) -> ProfilePatch {
        ProfilePatch {
            age: self.age,
            gender: self.gender,
            height: self.height,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub is_complete: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            is_complete: profile.is_complete(),
            profile,
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

/// GET /api/me
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

// ============================================================================
// Contact
// ============================================================================

/// POST /api/contact
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 10, max = 5000, message = "Message must be at least 10 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub id: Option<String>,
}
