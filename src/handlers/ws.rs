use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use validator::Validate;

use crate::auth::middleware::{authenticate, AuthUser};
use crate::dto::HistoryQuery;
use crate::error::{AppError, AppResult};
use crate::history::view::HistoryView;
use crate::history::HistoryRequest;
use crate::models::measurement::Metric;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
    metric: Option<Metric>,
    range: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    max_points: Option<usize>,
}

/// Sent by the client to change what it is looking at. An absent metric keeps
/// the current one; the filter fields replace the current filter.
#[derive(Debug, Default, Deserialize)]
pub struct WsCommand {
    #[serde(default)]
    pub metric: Option<Metric>,
    #[serde(flatten)]
    pub query: HistoryQuery,
}

impl WsCommand {
    fn into_request(
        self,
        user_id: &str,
        fallback_metric: Metric,
        ceiling: usize,
    ) -> AppResult<HistoryRequest> {
        self.query.validate()?;
        Ok(HistoryRequest {
            user_id: Some(user_id.to_string()),
            metric: self.metric.unwrap_or(fallback_metric),
            filter: self.query.filter()?,
            max_points: self.query.max_points(ceiling),
        })
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let auth_user = match query
        .token
        .as_deref()
        .ok_or(AppError::Unauthorized)
        .and_then(|token| authenticate(token, &state.config))
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return e.into_response();
        }
    };

    let command = WsCommand {
        metric: query.metric,
        query: HistoryQuery {
            range: query.range,
            from: query.from,
            to: query.to,
            max_points: query.max_points,
        },
    };
    let initial = match command.into_request(
        &auth_user.id,
        Metric::Weight,
        state.config.history_max_points,
    ) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, auth_user, initial))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    auth_user: AuthUser,
    initial: HistoryRequest,
) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = auth_user.id;

    tracing::debug!(user_id = %user_id, metric = %initial.metric, "WebSocket connection established");

    let view = HistoryView::new(state.history.clone());
    let mut updates = view.subscribe();
    let mut changes = state.history.store().subscribe();
    let ceiling = state.config.history_max_points;

    // Forward every lifecycle state of this connection's view to the client
    let mut send_task = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let payload = match serde_json::to_string(&*updates.borrow_and_update()) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode view state");
                    continue;
                }
            };
            if sender.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let uid = user_id.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut current = initial;
        let _ = view.request(current.clone()).await;

        loop {
            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let next = serde_json::from_str::<WsCommand>(&text)
                            .map_err(|e| AppError::Validation(e.to_string()))
                            .and_then(|cmd| cmd.into_request(&uid, current.metric, ceiling));
                        match next {
                            Ok(request) => {
                                current = request;
                                let _ = view.request(current.clone()).await;
                            }
                            Err(e) => {
                                tracing::debug!(user_id = %uid, error = %e, "Ignoring malformed WebSocket command");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                event = changes.recv() => match event {
                    Ok(event) if event.affects_measurements(&uid, current.metric) => {
                        let _ = view.request(current.clone()).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        let _ = view.request(current.clone()).await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
