//! Persistence seam.
//!
//! Handlers and the history engine only ever see these traits. Two backends
//! implement them: [`memory::MemoryStore`] for development and tests, and
//! [`postgres::PgStore`] for deployments with a `DATABASE_URL`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::calendar::CalendarEvent;
use crate::models::measurement::{MeasurementRecord, Metric};
use crate::models::profile::{Profile, ProfilePatch};

pub mod memory;
pub mod postgres;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A bounded, newest-first read of one user's measurements for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub user_id: String,
    pub metric: Metric,
    pub lower: Option<NaiveDateTime>,
    pub upper: Option<NaiveDateTime>,
    pub limit: usize,
}

impl RangeQuery {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.lower.map_or(true, |lower| at >= lower) && self.upper.map_or(true, |upper| at <= upper)
    }
}

/// Which per-user collection a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Measurements(Metric),
    Calendar,
    Profile,
}

/// Emitted on every successful write so live readers can re-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub user_id: String,
    pub collection: Collection,
}

impl ChangeEvent {
    pub fn affects_measurements(&self, user_id: &str, metric: Metric) -> bool {
        self.user_id == user_id && self.collection == Collection::Measurements(metric)
    }
}

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Records whose explicit `captured_at` lies within the query bounds, newest
    /// first, at most `limit` of them; followed by every record that has no
    /// explicit `captured_at`. The store cannot order or range those, so the
    /// caller resolves their instant itself.
    async fn query_range(&self, query: &RangeQuery) -> StoreResult<Vec<MeasurementRecord>>;

    /// Fails with [`StoreError::Conflict`] when the id is already taken.
    async fn insert_measurement(
        &self,
        user_id: &str,
        metric: Metric,
        record: &MeasurementRecord,
    ) -> StoreResult<()>;

    /// Returns whether a record was removed.
    async fn delete_measurement(&self, user_id: &str, metric: Metric, id: &str) -> StoreResult<bool>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Events with `lower <= starts_at <= upper`, ascending.
    async fn events_between(
        &self,
        user_id: &str,
        lower: NaiveDateTime,
        upper: NaiveDateTime,
    ) -> StoreResult<Vec<CalendarEvent>>;

    async fn insert_event(&self, user_id: &str, event: &CalendarEvent) -> StoreResult<()>;

    async fn delete_event(&self, user_id: &str, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;

    /// Merge `patch` into the stored profile, creating it if missing.
    async fn upsert_profile(&self, user_id: &str, patch: &ProfilePatch) -> StoreResult<Profile>;
}
