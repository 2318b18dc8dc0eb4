use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Datelike, Local, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{CalendarMonthResponse, CalendarQuery, CreateEventRequest, EventDeleteResponse};
use crate::error::{AppError, AppResult};
use crate::models::calendar::{month_bounds, parse_month, CalendarEvent};
use crate::AppState;

pub async fn list_events(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarMonthResponse>> {
    let (year, month) = match query.month.as_deref() {
        Some(raw) => parse_month(raw)
            .ok_or_else(|| AppError::Validation("month must look like YYYY-MM".into()))?,
        None => {
            let today = Local::now().date_naive();
            (today.year(), today.month())
        }
    };

    let (start, end) = month_bounds(year, month)
        .ok_or_else(|| AppError::Validation("month is out of range".into()))?;

    let events = state
        .calendar
        .events_between(&auth_user.id, start, end)
        .await?;

    Ok(Json(CalendarMonthResponse::new(
        format!("{year:04}-{month:02}"),
        events,
    )))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<CalendarEvent>)> {
    body.validate()?;

    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be blank".into()));
    }

    let event = CalendarEvent {
        id: Uuid::new_v4(),
        starts_at: body.starts_at(),
        title,
        description: body.description.filter(|d| !d.trim().is_empty()),
        category: body.category,
        created_at: Utc::now(),
    };

    state.calendar.insert_event(&auth_user.id, &event).await?;

    tracing::info!(user_id = %auth_user.id, event_id = %event.id, "Calendar event created");

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<EventDeleteResponse>> {
    let removed = state.calendar.delete_event(&auth_user.id, event_id).await?;

    Ok(Json(EventDeleteResponse {
        deleted: removed,
        id: event_id,
    }))
}
