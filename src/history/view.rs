//! Request lifecycle for one history consumer.
//!
//! `Idle -> Loading -> Ready | Failed`, back to `Loading` on every new request.
//! Only the most recently issued request may publish its outcome; a slower,
//! older response that lands afterwards is dropped.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::{HistoryEngine, HistoryError, HistoryRequest, HistorySnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewState {
    Idle,
    Loading { generation: u64 },
    Ready { generation: u64, snapshot: HistorySnapshot },
    Failed { generation: u64, failure: ViewFailure },
}

impl ViewState {
    pub fn generation(&self) -> Option<u64> {
        match self {
            ViewState::Idle => None,
            ViewState::Loading { generation }
            | ViewState::Ready { generation, .. }
            | ViewState::Failed { generation, .. } => Some(*generation),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, ViewState::Ready { .. } | ViewState::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewFailure {
    pub message: String,
    /// Whether offering the user a retry makes sense.
    pub retryable: bool,
}

impl From<&HistoryError> for ViewFailure {
    fn from(err: &HistoryError) -> Self {
        let message = match err {
            HistoryError::RetrievalFailed(_) => "Failed to load measurement history".to_string(),
            other => other.to_string(),
        };
        Self {
            message,
            retryable: err.is_retryable(),
        }
    }
}

pub struct HistoryView {
    engine: HistoryEngine,
    latest: Arc<Mutex<u64>>,
    state: Arc<watch::Sender<ViewState>>,
}

impl HistoryView {
    pub fn new(engine: HistoryEngine) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            engine,
            latest: Arc::new(Mutex::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Issue a new request, superseding any still in flight. The returned task
    /// resolves to `true` if its outcome was published.
    pub async fn request(&self, request: HistoryRequest) -> JoinHandle<bool> {
        let generation = {
            let mut latest = self.latest.lock().await;
            *latest += 1;
            self.state.send_replace(ViewState::Loading {
                generation: *latest,
            });
            *latest
        };

        let engine = self.engine.clone();
        let latest = Arc::clone(&self.latest);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let outcome = engine.fetch(&request).await;

            // Hold the lock while publishing so a newer request cannot slip its
            // Loading state in between the check and the write.
            let current = latest.lock().await;
            if *current != generation {
                tracing::debug!(
                    generation,
                    latest = *current,
                    metric = %request.metric,
                    "Discarding stale history response"
                );
                return false;
            }

            let next = match outcome {
                Ok(snapshot) => ViewState::Ready {
                    generation,
                    snapshot,
                },
                Err(e) => {
                    tracing::warn!(error = %e, metric = %request.metric, "History request failed");
                    ViewState::Failed {
                        generation,
                        failure: ViewFailure::from(&e),
                    }
                }
            };
            state.send_replace(next);
            true
        })
    }
}
