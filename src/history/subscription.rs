use futures_util::Stream;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::{HistoryEngine, HistoryError, HistoryRequest, HistorySnapshot};

/// Live history: one snapshot right away, then a fresh one after every write
/// to the watched (user, metric) collection. Each snapshot supersedes the
/// previous one. Notifications that pile up while a read is running collapse
/// into a single re-read.
///
/// The stream ends only if the store drops its notification channel. Dropping
/// the stream and calling this again restarts it.
pub fn watch_history(
    engine: HistoryEngine,
    request: HistoryRequest,
) -> impl Stream<Item = Result<HistorySnapshot, HistoryError>> {
    let mut changes = engine.store().subscribe();

    async_stream::stream! {
        yield engine.fetch(&request).await;

        loop {
            match changes.recv().await {
                Ok(event) => {
                    let relevant = request
                        .user_id
                        .as_deref()
                        .is_some_and(|user_id| event.affects_measurements(user_id, request.metric));
                    if !relevant {
                        continue;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "History watcher lagged, re-reading");
                }
                Err(RecvError::Closed) => break,
            }

            loop {
                match changes.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }

            yield engine.fetch(&request).await;
        }
    }
}
