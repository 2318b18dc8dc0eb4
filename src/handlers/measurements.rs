use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use chrono::{Local, Utc};
use futures_util::{Stream, StreamExt};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{
    CreateMeasurementRequest, DeleteResponse, HistoryQuery, HistoryResponse, MeasurementResponse,
};
use crate::error::AppResult;
use crate::history::subscription::watch_history;
use crate::history::view::ViewFailure;
use crate::history::HistoryRequest;
use crate::models::measurement::{legacy_id, IdFormat, MeasurementRecord, Metric};
use crate::AppState;

pub async fn get_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(metric): Path<Metric>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    query.validate()?;
    let filter = query.filter()?;

    let snapshot = state
        .history
        .fetch_history(
            Some(&auth_user.id),
            metric,
            &filter,
            query.max_points(state.config.history_max_points),
        )
        .await?;

    tracing::debug!(
        user_id = %auth_user.id,
        metric = %metric,
        filter = %filter,
        plotted = snapshot.points.len(),
        matched = snapshot.matched,
        excluded = snapshot.excluded,
        "History served"
    );

    Ok(Json(HistoryResponse::new(&filter, snapshot)))
}

/// Server-sent events: a `snapshot` event now and after every write to this
/// metric, or an `error` event when a read fails.
pub async fn stream_history(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(metric): Path<Metric>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    query.validate()?;
    let filter = query.filter()?;
    // Reject a reversed interval before opening the stream.
    filter.bounds(Local::now().naive_local())?;

    tracing::debug!(user_id = %auth_user.id, metric = %metric, filter = %filter, "History stream opened");

    let request = HistoryRequest {
        user_id: Some(auth_user.id),
        metric,
        filter: filter.clone(),
        max_points: query.max_points(state.config.history_max_points),
    };

    let events = watch_history(state.history.clone(), request).map(move |outcome| {
        let event = match outcome {
            Ok(snapshot) => Event::default()
                .event("snapshot")
                .json_data(HistoryResponse::new(&filter, snapshot)),
            Err(e) => {
                tracing::warn!(error = %e, "Live history read failed");
                Event::default()
                    .event("error")
                    .json_data(ViewFailure::from(&e))
            }
        };
        Ok(event.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode history event");
            Event::default().event("error").data("encoding failed")
        }))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn create_measurement(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(metric): Path<Metric>,
    Json(body): Json<CreateMeasurementRequest>,
) -> AppResult<(StatusCode, Json<MeasurementResponse>)> {
    body.validate_for(metric)?;

    let captured_at = body
        .captured_at
        .unwrap_or_else(|| Local::now().naive_local());

    let record = match body.id_format {
        IdFormat::Generated => MeasurementRecord {
            id: Uuid::new_v4().to_string(),
            value: body.value,
            captured_at: Some(captured_at),
            recorded_at: Some(Utc::now()),
        },
        IdFormat::Legacy => MeasurementRecord {
            id: legacy_id(captured_at),
            value: body.value,
            captured_at: None,
            recorded_at: None,
        },
    };

    state
        .measurements
        .insert_measurement(&auth_user.id, metric, &record)
        .await?;

    tracing::info!(
        user_id = %auth_user.id,
        metric = %metric,
        measurement_id = %record.id,
        "Measurement logged"
    );

    Ok((StatusCode::CREATED, Json(MeasurementResponse { metric, record })))
}

/// Idempotent: deleting an id that is already gone still returns 200.
pub async fn delete_measurement(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((metric, id)): Path<(Metric, String)>,
) -> AppResult<Json<DeleteResponse>> {
    let removed = state
        .measurements
        .delete_measurement(&auth_user.id, metric, &id)
        .await?;

    if removed {
        tracing::info!(user_id = %auth_user.id, metric = %metric, measurement_id = %id, "Measurement deleted");
    }

    Ok(Json(DeleteResponse { deleted: removed, id }))
}
