use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    CalendarStore, ChangeEvent, Collection, MeasurementStore, ProfileStore, RangeQuery,
    StoreError, StoreResult,
};
use crate::models::calendar::CalendarEvent;
use crate::models::measurement::{MeasurementRecord, Metric};
use crate::models::profile::{Profile, ProfilePatch};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

// Postgres unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed store. Change notifications only cover writes made through
/// this process.
pub struct PgStore {
    db: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { db, changes }
    }

    fn notify(&self, user_id: &str, collection: Collection) {
        let _ = self.changes.send(ChangeEvent {
            user_id: user_id.to_string(),
            collection,
        });
    }
}

#[async_trait]
impl MeasurementStore for PgStore {
    async fn query_range(&self, query: &RangeQuery) -> StoreResult<Vec<MeasurementRecord>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let mut records = sqlx::query_as::<_, MeasurementRecord>(
            r#"
            SELECT id, value, captured_at, recorded_at FROM measurements
            WHERE user_id = $1 AND metric = $2
              AND captured_at IS NOT NULL
              AND ($3::timestamp IS NULL OR captured_at >= $3)
              AND ($4::timestamp IS NULL OR captured_at <= $4)
            ORDER BY captured_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(&query.user_id)
        .bind(query.metric)
        .bind(query.lower)
        .bind(query.upper)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let legacy = sqlx::query_as::<_, MeasurementRecord>(
            r#"
            SELECT id, value, captured_at, recorded_at FROM measurements
            WHERE user_id = $1 AND metric = $2 AND captured_at IS NULL
            ORDER BY id DESC
            "#,
        )
        .bind(&query.user_id)
        .bind(query.metric)
        .fetch_all(&self.db)
        .await?;

        records.extend(legacy);
        Ok(records)
    }

    async fn insert_measurement(
        &self,
        user_id: &str,
        metric: Metric,
        record: &MeasurementRecord,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO measurements (user_id, metric, id, value, captured_at, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(metric)
        .bind(&record.id)
        .bind(record.value)
        .bind(record.captured_at)
        .bind(record.recorded_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                self.notify(user_id, Collection::Measurements(metric));
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => Err(
                StoreError::Conflict(format!("Measurement {} already exists", record.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_measurement(&self, user_id: &str, metric: Metric, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM measurements WHERE user_id = $1 AND metric = $2 AND id = $3")
            .bind(user_id)
            .bind(metric)
            .bind(id)
            .execute(&self.db)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.notify(user_id, Collection::Measurements(metric));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl CalendarStore for PgStore {
    async fn events_between(
        &self,
        user_id: &str,
        lower: NaiveDateTime,
        upper: NaiveDateTime,
    ) -> StoreResult<Vec<CalendarEvent>> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            r#"
            SELECT id, title, description, category, starts_at, created_at
            FROM calendar_events
            WHERE user_id = $1 AND starts_at BETWEEN $2 AND $3
            ORDER BY starts_at ASC
            "#,
        )
        .bind(user_id)
        .bind(lower)
        .bind(upper)
        .fetch_all(&self.db)
        .await?;

        Ok(events)
    }

    async fn insert_event(&self, user_id: &str, event: &CalendarEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO calendar_events (id, user_id, title, description, category, starts_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(user_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category)
        .bind(event.starts_at)
        .bind(event.created_at)
        .execute(&self.db)
        .await?;

        self.notify(user_id, Collection::Calendar);
        Ok(())
    }

    async fn delete_event(&self, user_id: &str, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.notify(user_id, Collection::Calendar);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT age, gender, height, updated_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn upsert_profile(&self, user_id: &str, patch: &ProfilePatch) -> StoreResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, age, gender, height)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                age = COALESCE($2, profiles.age),
                gender = COALESCE($3, profiles.gender),
                height = COALESCE($4, profiles.height),
                updated_at = NOW()
            RETURNING age, gender, height, updated_at
            "#,
        )
        .bind(user_id)
        .bind(patch.age)
        .bind(patch.gender)
        .bind(patch.height)
        .fetch_one(&self.db)
        .await?;

        self.notify(user_id, Collection::Profile);
        Ok(profile)
    }
}
