use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::auth::{jwt_auth_middleware, JwtService, UserSession};
use crate::models::{
    validate_calendar_event, validate_event_times, validate_event_type, CalendarEvent,
    CalendarRange, CreateCalendarEvent, UpdateCalendarEvent, ValidationError,
};

const DEFAULT_EVENT_TYPE: &str = "workout";

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub success: bool,
    pub events: Vec<CalendarEvent>,
    pub total: usize,
}

pub fn calendar_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route("/calendar", get(list_events).post(create_event))
        .route("/calendar/:event_id", put(update_event).delete(delete_event))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

/// Events whose start falls inside `from..=to`, earliest first
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    query: Result<Query<CalendarRange>, QueryRejection>,
) -> Result<Json<CalendarResponse>, ApiError> {
    let Query(range) = query?;

    if let (Some(from), Some(to)) = (range.from, range.to) {
        if to < from {
            return Err(ValidationError::invalid("to", "Range end must not be before its start").into());
        }
    }

    let events = state.repo.list_events(session.user_id, range).await?;

    Ok(Json(CalendarResponse {
        success: true,
        total: events.len(),
        events,
    }))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    body: Result<Json<CreateCalendarEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<CalendarEvent>), ApiError> {
    let Json(request) = body?;
    validate_calendar_event(&request)?;

    let (Some(title), Some(starts_at)) = (request.title, request.starts_at) else {
        return Err(ApiError::BadRequest("Incomplete calendar event".to_string()));
    };

    let now = Utc::now();
    let event = CalendarEvent {
        id: Uuid::new_v4(),
        user_id: session.user_id,
        title: title.trim().to_string(),
        event_type: request
            .event_type
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        starts_at,
        ends_at: request.ends_at,
        notes: request.notes,
        completed: false,
        created_at: now,
        updated_at: now,
    };

    let saved = state.repo.insert_event(event).await?;
    info!(event_id = %saved.id, "Calendar event created");

    Ok((StatusCode::CREATED, Json(saved)))
}

#[instrument(skip_all, fields(user_id = %session.user_id, event_id = %event_id))]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(event_id): Path<Uuid>,
    body: Result<Json<UpdateCalendarEvent>, JsonRejection>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let Json(update) = body?;

    if let Some(title) = update.title.as_deref() {
        if title.trim().is_empty() {
            return Err(ValidationError::MissingFields(vec!["title".to_string()]).into());
        }
    }

    let mut event = state
        .repo
        .get_event(session.user_id, event_id)
        .await?
        .ok_or(ApiError::NotFound("Calendar event"))?;

    event.apply(update);
    event.event_type = event.event_type.to_lowercase();
    validate_event_type(&event.event_type)?;
    validate_event_times(event.starts_at, event.ends_at)?;

    let saved = state
        .repo
        .update_event(event)
        .await?
        .ok_or(ApiError::NotFound("Calendar event"))?;

    Ok(Json(saved))
}

#[instrument(skip_all, fields(user_id = %session.user_id, event_id = %event_id))]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !state.repo.delete_event(session.user_id, event_id).await? {
        return Err(ApiError::NotFound("Calendar event"));
    }

    info!("Calendar event deleted");
    Ok(Json(json!({ "success": true, "deleted": event_id })))
}
