use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::Json,
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use tracing::{info, instrument};

use super::{ApiError, AppState};
use crate::auth::{jwt_auth_middleware, JwtService, UserSession};
use crate::models::{validate_profile, ProfileResponse, UpsertUserProfile, UserProfile};
use crate::services::phone::normalize_phone;

pub fn user_profile_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(upsert_profile))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

fn profile_response(profile: UserProfile) -> ProfileResponse {
    let (completion_percentage, missing_fields) = profile.completion();
    ProfileResponse {
        profile,
        completion_percentage,
        missing_fields,
        success: true,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the caller's profile
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .repo
        .get_profile(session.user_id)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    Ok(Json(profile_response(profile)))
}

/// Create or replace the caller's profile (onboarding wizard and profile form)
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    body: Result<Json<UpsertUserProfile>, JsonRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Json(request) = body?;
    validate_profile(&request)?;

    let phone = non_blank(request.phone).and_then(|p| normalize_phone(&p));
    if let Some(phone) = phone.as_deref() {
        if let Some(owner) = state.repo.find_profile_by_phone(phone).await? {
            if owner.user_id != session.user_id {
                return Err(ApiError::Conflict(
                    "Phone number is already linked to another profile".to_string(),
                ));
            }
        }
    }

    let email = non_blank(request.email)
        .or_else(|| Some(session.email.clone()).filter(|e| !e.is_empty()));

    let now = Utc::now();
    let profile = UserProfile {
        user_id: session.user_id,
        full_name: non_blank(request.full_name).unwrap_or_default(),
        email,
        phone,
        birth_date: request.birth_date,
        gender: non_blank(request.gender),
        height_cm: request.height_cm,
        weight_kg: request.weight_kg,
        fitness_level: non_blank(request.fitness_level).map(|l| l.to_lowercase()),
        primary_goal: non_blank(request.primary_goal).unwrap_or_default(),
        training_days_per_week: request.training_days_per_week,
        available_equipment: request.available_equipment,
        injuries: non_blank(request.injuries),
        dietary_restrictions: request.dietary_restrictions,
        onboarding_completed: request.onboarding_completed,
        created_at: now,
        updated_at: now,
    };

    let saved = state.repo.upsert_profile(profile).await?;
    info!("Profile saved");

    Ok(Json(profile_response(saved)))
}
