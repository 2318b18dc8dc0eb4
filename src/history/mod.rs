//! Measurement history: bounded range read, legacy timestamp resolution,
//! trend and chart shaping.
//!
//! [`HistoryEngine::fetch_history`] is the primitive. [`view::HistoryView`]
//! layers the last-request-wins lifecycle on top of it and
//! [`subscription::watch_history`] re-runs it whenever the store reports a
//! write to the watched collection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::measurement::{Metric, MeasurementRecord};
use crate::store::{MeasurementStore, RangeQuery, StoreError};

pub mod subscription;
pub mod timestamp;
pub mod view;

use timestamp::{chart_label, CaptureInstant};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Bad caller input. Retrying with the same arguments fails again.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Failed to retrieve measurements: {0}")]
    RetrievalFailed(#[source] StoreError),
}

impl HistoryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, HistoryError::RetrievalFailed(_))
    }
}

/// Source of "now" for preset windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Server-local wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Trailing lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Days(u32),
    All,
}

impl FromStr for Preset {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Preset::All);
        }
        s.strip_suffix('d')
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .map(Preset::Days)
            .ok_or_else(|| {
                HistoryError::InvalidFilter(format!(
                    "range must be \"all\" or a day count like \"30d\", got \"{s}\""
                ))
            })
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Days(n) => write!(f, "{n}d"),
            Preset::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryFilter {
    Preset(Preset),
    /// Closed interval of calendar days.
    Interval { from: NaiveDate, to: NaiveDate },
}

impl Default for HistoryFilter {
    fn default() -> Self {
        HistoryFilter::Preset(Preset::All)
    }
}

impl HistoryFilter {
    /// Inclusive wall-clock bounds for the store query.
    pub fn bounds(
        &self,
        now: NaiveDateTime,
    ) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), HistoryError> {
        match *self {
            HistoryFilter::Preset(Preset::All) => Ok((None, None)),
            HistoryFilter::Preset(Preset::Days(days)) => {
                let start = now
                    .checked_sub_signed(Duration::days(i64::from(days)))
                    .ok_or_else(|| {
                        HistoryError::InvalidFilter(format!(
                            "range of {days} days reaches past the supported calendar"
                        ))
                    })?;
                Ok((Some(start), Some(now)))
            }
            HistoryFilter::Interval { from, to } => {
                if from > to {
                    return Err(HistoryError::InvalidFilter(format!(
                        "from ({from}) must not be after to ({to})"
                    )));
                }
                let start = from.and_hms_opt(0, 0, 0);
                let end = to.and_hms_nano_opt(23, 59, 59, 999_999_999);
                Ok((start, end))
            }
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryFilter::Preset(preset) => write!(f, "{preset}"),
            HistoryFilter::Interval { from, to } => write!(f, "{from}..{to}"),
        }
    }
}

/// Arguments of one history read, bundled for callers that re-issue it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    pub user_id: Option<String>,
    pub metric: Metric,
    pub filter: HistoryFilter,
    pub max_points: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub id: String,
    pub label: String,
    pub captured_at: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Percent of the oldest value, one decimal.
    pub magnitude: f64,
}

impl Trend {
    pub const NONE: Trend = Trend {
        direction: TrendDirection::None,
        magnitude: 0.0,
    };

    /// Endpoint difference across chronologically ordered points.
    pub fn between(points: &[ChartPoint]) -> Self {
        let (Some(oldest), Some(newest)) = (points.first(), points.last()) else {
            return Trend::NONE;
        };
        if points.len() < 2 {
            return Trend::NONE;
        }

        let difference = newest.value - oldest.value;
        let magnitude = if oldest.value == 0.0 {
            0.0
        } else {
            round_one_decimal(difference.abs() / oldest.value * 100.0)
        };
        let direction = if difference < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Up
        };

        Trend {
            direction,
            magnitude,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Y-axis bounds with two units of headroom either side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartDomain {
    pub min: f64,
    pub max: f64,
}

impl ChartDomain {
    pub fn spanning(points: &[ChartPoint]) -> Option<Self> {
        let mut values = points.iter().map(|p| p.value);
        let first = values.next()?;
        let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(ChartDomain {
            min: (min - 2.0).floor(),
            max: (max + 2.0).ceil(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub metric: Metric,
    pub unit: &'static str,
    /// Oldest first.
    pub points: Vec<ChartPoint>,
    pub trend: Trend,
    /// Records the bounded query matched, including ones that cannot be plotted.
    pub matched: usize,
    /// Matched records whose capture instant could not be resolved.
    pub excluded: usize,
    pub domain: Option<ChartDomain>,
}

impl HistorySnapshot {
    /// Nothing to plot: the "no data in range" state.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Clone)]
pub struct HistoryEngine {
    store: Arc<dyn MeasurementStore>,
    clock: Arc<dyn Clock>,
    default_points: usize,
}

impl HistoryEngine {
    pub fn new(store: Arc<dyn MeasurementStore>, default_points: usize) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            default_points,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn MeasurementStore> {
        &self.store
    }

    pub async fn fetch(&self, request: &HistoryRequest) -> Result<HistorySnapshot, HistoryError> {
        self.fetch_history(
            request.user_id.as_deref(),
            request.metric,
            &request.filter,
            request.max_points,
        )
        .await
    }

    pub async fn fetch_history(
        &self,
        user_id: Option<&str>,
        metric: Metric,
        filter: &HistoryFilter,
        max_points: Option<usize>,
    ) -> Result<HistorySnapshot, HistoryError> {
        let user_id = user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(HistoryError::NotAuthenticated)?;

        let limit = max_points.unwrap_or(self.default_points);
        if limit == 0 {
            return Err(HistoryError::InvalidFilter(
                "max_points must be a positive integer".into(),
            ));
        }

        let (lower, upper) = filter.bounds(self.clock.now())?;
        let query = RangeQuery {
            user_id: user_id.to_string(),
            metric,
            lower,
            upper,
            limit,
        };

        let records = self
            .store
            .query_range(&query)
            .await
            .map_err(HistoryError::RetrievalFailed)?;

        let mut resolved: Vec<(NaiveDateTime, MeasurementRecord)> = Vec::with_capacity(records.len());
        let mut excluded = 0;
        for record in records {
            match CaptureInstant::of(&record).instant() {
                Some(at) if query.contains(at) => resolved.push((at, record)),
                // Legacy record outside the window.
                Some(_) => {}
                None => excluded += 1,
            }
        }

        resolved.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.id.cmp(&a.1.id)));
        let matched = resolved.len() + excluded;
        resolved.truncate(limit);
        resolved.reverse();

        let points: Vec<ChartPoint> = resolved
            .into_iter()
            .map(|(at, record)| ChartPoint {
                id: record.id,
                label: chart_label(at),
                captured_at: at,
                value: record.value,
            })
            .collect();

        Ok(HistorySnapshot {
            metric,
            unit: metric.unit(),
            trend: Trend::between(&points),
            domain: ChartDomain::spanning(&points),
            points,
            matched,
            excluded,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{dt, record, FixedClock};
    use super::*;
    use crate::store::memory::MemoryStore;

    const USER: &str = "user-1";

    fn engine_at(store: Arc<MemoryStore>, now: NaiveDateTime) -> HistoryEngine {
        HistoryEngine::new(store, 10).with_clock(Arc::new(FixedClock(now)))
    }

    async fn seed(store: &MemoryStore, records: &[MeasurementRecord]) {
        for r in records {
            store.insert_measurement(USER, Metric::Weight, r).await.unwrap();
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    // ── Preset parsing ───────────────────────────────────────────────────

    #[test]
    fn test_preset_parse() {
        assert_eq!("7d".parse::<Preset>().unwrap(), Preset::Days(7));
        assert_eq!("30d".parse::<Preset>().unwrap(), Preset::Days(30));
        assert_eq!("all".parse::<Preset>().unwrap(), Preset::All);
        assert!("0d".parse::<Preset>().is_err());
        assert!("7".parse::<Preset>().is_err());
        assert!("week".parse::<Preset>().is_err());
        assert!("+7d".parse::<Preset>().is_err());
        assert!("-7d".parse::<Preset>().is_err());
        assert!("d".parse::<Preset>().is_err());
    }

    #[test]
    fn test_huge_day_count_is_invalid_not_a_panic() {
        let preset = "999999999d".parse::<Preset>().unwrap();
        let result = HistoryFilter::Preset(preset).bounds(dt(2024, 2, 1, 0, 0));
        assert!(matches!(result, Err(HistoryError::InvalidFilter(_))));
    }

    #[test]
    fn test_preset_display_round_trips() {
        assert_eq!(Preset::Days(90).to_string(), "90d");
        assert_eq!(Preset::All.to_string(), "all");
    }

    // ── Trend ────────────────────────────────────────────────────────────

    fn point(value: f64) -> ChartPoint {
        ChartPoint {
            id: String::new(),
            label: String::new(),
            captured_at: dt(2024, 1, 1, 0, 0),
            value,
        }
    }

    #[test]
    fn test_trend_down_five_percent() {
        let trend = Trend::between(&[point(80.0), point(78.0), point(76.0)]);
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.magnitude, 5.0);
    }

    #[test]
    fn test_trend_flat_counts_as_up() {
        let trend = Trend::between(&[point(70.0), point(70.0)]);
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.magnitude, 0.0);
    }

    #[test]
    fn test_trend_rounds_to_one_decimal() {
        // 1/3 of a percent
        let trend = Trend::between(&[point(75.0), point(75.25)]);
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.magnitude, 0.3);
    }

    #[test]
    fn test_trend_needs_two_points() {
        assert_eq!(Trend::between(&[]), Trend::NONE);
        assert_eq!(Trend::between(&[point(80.0)]), Trend::NONE);
    }

    #[test]
    fn test_chart_domain_headroom() {
        let domain = ChartDomain::spanning(&[point(76.4), point(80.2)]).unwrap();
        assert_eq!(domain.min, 74.0);
        assert_eq!(domain.max, 83.0);
        assert!(ChartDomain::spanning(&[]).is_none());
    }

    // ── Engine ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_points_are_chronological_with_trend() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("c", 76.0, Some(dt(2024, 1, 9, 8, 0))),
                record("a", 80.0, Some(dt(2024, 1, 1, 8, 0))),
                record("b", 78.5, Some(dt(2024, 1, 5, 8, 0))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 1, 10, 12, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();

        let ids: Vec<_> = snapshot.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(snapshot
            .points
            .windows(2)
            .all(|w| w[0].captured_at <= w[1].captured_at));
        assert_eq!(snapshot.trend.direction, TrendDirection::Down);
        assert_eq!(snapshot.trend.magnitude, 5.0);
        assert_eq!(snapshot.matched, 3);
        assert_eq!(snapshot.unit, "kg");
        assert_eq!(snapshot.points[0].label, "Jan 01, 08:00");
    }

    #[tokio::test]
    async fn test_output_reversed_matches_store_order() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("a", 80.0, Some(dt(2024, 1, 1, 8, 0))),
                record("b", 79.0, Some(dt(2024, 1, 2, 8, 0))),
                record("c", 78.0, Some(dt(2024, 1, 3, 8, 0))),
            ],
        )
        .await;
        let engine = engine_at(store.clone(), dt(2024, 1, 10, 12, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();
        let raw = store
            .query_range(&RangeQuery {
                user_id: USER.into(),
                metric: Metric::Weight,
                lower: None,
                upper: None,
                limit: 10,
            })
            .await
            .unwrap();

        let mut plotted: Vec<_> = snapshot.points.iter().map(|p| p.id.clone()).collect();
        plotted.reverse();
        let stored: Vec<_> = raw.into_iter().map(|r| r.id).collect();
        assert_eq!(plotted, stored);
    }

    #[tokio::test]
    async fn test_all_keeps_most_recent_max_points() {
        let store = Arc::new(MemoryStore::new());
        let records: Vec<_> = (1..=15)
            .map(|d| record(&format!("r{d:02}"), 70.0 + d as f64, Some(dt(2024, 1, d, 7, 0))))
            .collect();
        seed(&store, &records).await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(snapshot.points.len(), 10);
        assert_eq!(snapshot.points.first().unwrap().id, "r06");
        assert_eq!(snapshot.points.last().unwrap().id, "r15");

        let three = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), Some(3))
            .await
            .unwrap();
        let ids: Vec<_> = three.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["r13", "r14", "r15"]);
    }

    #[tokio::test]
    async fn test_preset_days_window() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("old", 82.0, Some(dt(2024, 1, 1, 11, 59))),
                record("edge", 81.0, Some(dt(2024, 1, 3, 12, 0))),
                record("new", 80.0, Some(dt(2024, 1, 9, 9, 0))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 1, 10, 12, 0));

        let snapshot = engine
            .fetch_history(
                Some(USER),
                Metric::Weight,
                &HistoryFilter::Preset(Preset::Days(7)),
                None,
            )
            .await
            .unwrap();
        let ids: Vec<_> = snapshot.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "new"]);
    }

    #[tokio::test]
    async fn test_interval_is_whole_days_inclusive() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("before", 80.0, Some(dt(2024, 1, 4, 23, 59))),
                record("start", 80.0, Some(dt(2024, 1, 5, 0, 0))),
                record("end", 79.0, Some(dt(2024, 1, 10, 23, 59))),
                record("after", 78.0, Some(dt(2024, 1, 11, 0, 0))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));

        let snapshot = engine
            .fetch_history(
                Some(USER),
                Metric::Weight,
                &HistoryFilter::Interval {
                    from: day(5),
                    to: day(10),
                },
                None,
            )
            .await
            .unwrap();
        let ids: Vec<_> = snapshot.points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "end"]);
    }

    #[tokio::test]
    async fn test_interval_reversed_is_invalid() {
        let engine = engine_at(Arc::new(MemoryStore::new()), dt(2024, 2, 1, 0, 0));
        let err = engine
            .fetch_history(
                Some(USER),
                Metric::Weight,
                &HistoryFilter::Interval {
                    from: day(10),
                    to: day(5),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidFilter(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_single_day_interval_is_valid() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[record("a", 80.0, Some(dt(2024, 1, 5, 13, 0)))]).await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));
        let snapshot = engine
            .fetch_history(
                Some(USER),
                Metric::Weight,
                &HistoryFilter::Interval {
                    from: day(5),
                    to: day(5),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(snapshot.points.len(), 1);
        assert_eq!(snapshot.trend, Trend::NONE);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_authenticated() {
        let engine = engine_at(Arc::new(MemoryStore::new()), dt(2024, 2, 1, 0, 0));
        for user in [None, Some(""), Some("  ")] {
            let err = engine
                .fetch_history(user, Metric::Weight, &HistoryFilter::default(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, HistoryError::NotAuthenticated));
        }
    }

    #[tokio::test]
    async fn test_zero_max_points_is_invalid() {
        let engine = engine_at(Arc::new(MemoryStore::new()), dt(2024, 2, 1, 0, 0));
        let err = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_legacy_ids_are_plotted() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("2024-03-02T14_30_00-000", 80.0, None),
                record("new-1", 76.0, Some(dt(2024, 3, 5, 9, 15))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 3, 10, 0, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(snapshot.points.len(), 2);
        assert_eq!(snapshot.points[0].captured_at, dt(2024, 3, 2, 14, 30));
        assert_eq!(snapshot.points[0].label, "Mar 02, 14:30");
        assert_eq!(snapshot.trend.direction, TrendDirection::Down);
        assert_eq!(snapshot.trend.magnitude, 5.0);
    }

    #[tokio::test]
    async fn test_legacy_record_outside_window_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("2023-12-02T14_30_00-000", 80.0, None),
                record("in", 79.0, Some(dt(2024, 1, 6, 9, 0))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));
        let snapshot = engine
            .fetch_history(
                Some(USER),
                Metric::Weight,
                &HistoryFilter::Interval {
                    from: day(1),
                    to: day(31),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(snapshot.points.len(), 1);
        assert_eq!(snapshot.matched, 1);
    }

    #[tokio::test]
    async fn test_unresolvable_records_counted_not_plotted() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("garbage-id", 95.0, None),
                record("a", 80.0, Some(dt(2024, 1, 1, 8, 0))),
                record("b", 76.0, Some(dt(2024, 1, 2, 8, 0))),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(snapshot.points.len(), 2);
        assert!(snapshot.points.iter().all(|p| p.id != "garbage-id"));
        assert_eq!(snapshot.matched, 3);
        assert_eq!(snapshot.excluded, 1);
        assert_eq!(snapshot.trend.magnitude, 5.0);
    }

    #[tokio::test]
    async fn test_only_unresolvable_records_is_empty_without_trend() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[record("x", 80.0, None), record("y", 70.0, None)]).await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));

        let snapshot = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.trend, Trend::NONE);
        assert_eq!(snapshot.matched, 2);
        assert!(snapshot.domain.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_retrieval_failed() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));

        let err = engine
            .fetch_history(Some(USER), Metric::Weight, &HistoryFilter::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::RetrievalFailed(StoreError::Unavailable(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            &[
                record("a", 80.0, Some(dt(2024, 1, 1, 8, 0))),
                record("b", 81.0, Some(dt(2024, 1, 2, 8, 0))),
                record("2024-01-03T07_45_00-000", 80.5, None),
            ],
        )
        .await;
        let engine = engine_at(store, dt(2024, 2, 1, 0, 0));
        let filter = HistoryFilter::Preset(Preset::Days(60));

        let first = engine.fetch_history(Some(USER), Metric::Weight, &filter, None).await.unwrap();
        let second = engine.fetch_history(Some(USER), Metric::Weight, &filter, None).await.unwrap();
        assert_eq!(first, second);
    }
}
