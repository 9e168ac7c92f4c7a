use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    middleware,
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiError, AppState};
use crate::auth::{jwt_auth_middleware, JwtService, UserSession};
use crate::models::{
    clamp_activity_limit, ActivityTotals, ImportStravaActivity, StravaActivity, ValidationError,
};

const MAX_IMPORT_BATCH: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImportActivitiesRequest {
    pub activities: Vec<ImportStravaActivity>,
}

#[derive(Debug, Serialize)]
pub struct ActivitiesResponse {
    pub success: bool,
    pub activities: Vec<StravaActivity>,
    pub totals: ActivityTotals,
}

#[derive(Debug, Serialize)]
pub struct ImportActivitiesResponse {
    pub success: bool,
    pub imported: usize,
    pub activities: Vec<StravaActivity>,
}

pub fn activity_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(import_activities))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

/// Most recent Strava activities first
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn list_activities(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Result<Json<ActivitiesResponse>, ApiError> {
    let Query(query) = query?;
    let limit = clamp_activity_limit(query.limit);

    let activities = state.repo.list_activities(session.user_id, limit).await?;
    let totals = ActivityTotals::from_activities(&activities);

    Ok(Json(ActivitiesResponse {
        success: true,
        activities,
        totals,
    }))
}

/// Upsert a batch of activities keyed by their Strava id. A batch touching
/// another user's activity is rejected whole.
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn import_activities(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    body: Result<Json<ImportActivitiesRequest>, JsonRejection>,
) -> Result<Json<ImportActivitiesResponse>, ApiError> {
    let Json(request) = body?;

    if request.activities.len() > MAX_IMPORT_BATCH {
        return Err(ValidationError::invalid(
            "activities",
            format!("At most {} activities per import", MAX_IMPORT_BATCH),
        )
        .into());
    }

    for activity in &request.activities {
        validate_import(activity)?;
    }

    let strava_ids: Vec<i64> = request.activities.iter().map(|a| a.strava_id).collect();
    let foreign = state
        .repo
        .foreign_strava_ids(session.user_id, &strava_ids)
        .await?;
    if !foreign.is_empty() {
        return Err(ApiError::Conflict(format!(
            "Strava activities {:?} belong to another user",
            foreign
        )));
    }

    let saved = state
        .repo
        .import_activities(session.user_id, request.activities)
        .await?;

    info!(count = saved.len(), "Strava activities imported");

    Ok(Json(ImportActivitiesResponse {
        success: true,
        imported: saved.len(),
        activities: saved,
    }))
}

fn validate_import(activity: &ImportStravaActivity) -> Result<(), ValidationError> {
    if activity.strava_id <= 0 {
        return Err(ValidationError::invalid("strava_id", "Must be positive"));
    }
    if activity.name.trim().is_empty() {
        return Err(ValidationError::MissingFields(vec!["name".to_string()]));
    }
    if activity.distance_m < 0.0 || activity.moving_time_s < 0 {
        return Err(ValidationError::invalid(
            "distance_m",
            "Distance and moving time must not be negative",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn activity() -> ImportStravaActivity {
        ImportStravaActivity {
            strava_id: 101,
            name: "Morning Run".to_string(),
            sport_type: "Run".to_string(),
            start_date: Utc::now(),
            distance_m: 5000.0,
            moving_time_s: 1500,
            elevation_gain_m: None,
            average_heartrate: None,
        }
    }

    #[test]
    fn test_validate_import() {
        assert!(validate_import(&activity()).is_ok());

        let mut unnamed = activity();
        unnamed.name = "  ".to_string();
        assert_eq!(
            validate_import(&unnamed),
            Err(ValidationError::MissingFields(vec!["name".to_string()]))
        );

        let mut negative = activity();
        negative.distance_m = -1.0;
        assert!(validate_import(&negative).is_err());
    }
}
