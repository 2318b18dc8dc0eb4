use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{
    CalendarStore, ChangeEvent, Collection, MeasurementStore, ProfileStore, RangeQuery,
    StoreError, StoreResult,
};
use crate::models::calendar::CalendarEvent;
use crate::models::measurement::{MeasurementRecord, Metric};
use crate::models::profile::{Profile, ProfilePatch};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Process-local store with the same read semantics as the Postgres backend.
pub struct MemoryStore {
    measurements: RwLock<HashMap<(String, Metric), BTreeMap<String, MeasurementRecord>>>,
    events: RwLock<HashMap<String, Vec<CalendarEvent>>>,
    profiles: RwLock<HashMap<String, Profile>>,
    changes: broadcast::Sender<ChangeEvent>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            measurements: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            changes,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    fn notify(&self, user_id: &str, collection: Collection) {
        // No receivers is fine.
        let _ = self.changes.send(ChangeEvent {
            user_id: user_id.to_string(),
            collection,
        });
    }
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn query_range(&self, query: &RangeQuery) -> StoreResult<Vec<MeasurementRecord>> {
        self.check_available()?;
        let measurements = self.measurements.read().await;
        let Some(collection) = measurements.get(&(query.user_id.clone(), query.metric)) else {
            return Ok(Vec::new());
        };

        let mut timestamped: Vec<&MeasurementRecord> = collection
            .values()
            .filter(|r| r.captured_at.is_some_and(|at| query.contains(at)))
            .collect();
        timestamped.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then_with(|| b.id.cmp(&a.id)));
        timestamped.truncate(query.limit);

        let untimestamped = collection
            .values()
            .rev()
            .filter(|r| r.captured_at.is_none());

        Ok(timestamped
            .into_iter()
            .chain(untimestamped)
            .cloned()
            .collect())
    }

    async fn insert_measurement(
        &self,
        user_id: &str,
        metric: Metric,
        record: &MeasurementRecord,
    ) -> StoreResult<()> {
        self.check_available()?;
        {
            let mut measurements = self.measurements.write().await;
            let collection = measurements
                .entry((user_id.to_string(), metric))
                .or_default();
            if collection.contains_key(&record.id) {
                return Err(StoreError::Conflict(format!(
                    "Measurement {} already exists",
                    record.id
                )));
            }
            collection.insert(record.id.clone(), record.clone());
        }
        self.notify(user_id, Collection::Measurements(metric));
        Ok(())
    }

    async fn delete_measurement(&self, user_id: &str, metric: Metric, id: &str) -> StoreResult<bool> {
        self.check_available()?;
        let removed = {
            let mut measurements = self.measurements.write().await;
            measurements
                .get_mut(&(user_id.to_string(), metric))
                .and_then(|collection| collection.remove(id))
                .is_some()
        };
        if removed {
            self.notify(user_id, Collection::Measurements(metric));
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn events_between(
        &self,
        user_id: &str,
        lower: NaiveDateTime,
        upper: NaiveDateTime,
    ) -> StoreResult<Vec<CalendarEvent>> {
        self.check_available()?;
        let events = self.events.read().await;
        let mut found: Vec<CalendarEvent> = events
            .get(user_id)
            .map(|all| {
                all.iter()
                    .filter(|e| e.starts_at >= lower && e.starts_at <= upper)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|e| e.starts_at);
        Ok(found)
    }

    async fn insert_event(&self, user_id: &str, event: &CalendarEvent) -> StoreResult<()> {
        self.check_available()?;
        self.events
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(event.clone());
        self.notify(user_id, Collection::Calendar);
        Ok(())
    }

    async fn delete_event(&self, user_id: &str, id: Uuid) -> StoreResult<bool> {
        self.check_available()?;
        let removed = {
            let mut events = self.events.write().await;
            match events.get_mut(user_id) {
                Some(all) => {
                    let before = all.len();
                    all.retain(|e| e.id != id);
                    all.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(user_id, Collection::Calendar);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        self.check_available()?;
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn upsert_profile(&self, user_id: &str, patch: &ProfilePatch) -> StoreResult<Profile> {
        self.check_available()?;
        let profile = {
            let mut profiles = self.profiles.write().await;
            let profile = profiles.entry(user_id.to_string()).or_default();
            profile.merge(patch);
            profile.updated_at = Some(Utc::now());
            profile.clone()
        };
        self.notify(user_id, Collection::Profile);
        Ok(profile)
    }
}
