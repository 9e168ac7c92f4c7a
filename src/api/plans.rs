use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::Json,
    routing::get,
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
    validate_nutrition_plan, validate_training_plan, NutritionPlan, TrainingPlan,
    UpsertNutritionPlan, UpsertTrainingPlan,
};

#[derive(Debug, Serialize)]
pub struct TrainingPlanResponse {
    pub success: bool,
    pub plan: TrainingPlan,
    pub week_count: usize,
    pub active_today: bool,
}

#[derive(Debug, Serialize)]
pub struct NutritionPlanResponse {
    pub success: bool,
    pub plan: NutritionPlan,
    pub macro_calories: f64,
}

pub fn plan_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route(
            "/training-plan",
            get(get_training_plan).put(upsert_training_plan),
        )
        .route(
            "/nutrition-plan",
            get(get_nutrition_plan).put(upsert_nutrition_plan),
        )
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

fn or_default(value: Value, default: Value) -> Value {
    if value.is_null() {
        default
    } else {
        value
    }
}

fn training_response(plan: TrainingPlan) -> TrainingPlanResponse {
    TrainingPlanResponse {
        week_count: plan.week_count(),
        active_today: plan.is_active_on(Utc::now().date_naive()),
        plan,
        success: true,
    }
}

fn nutrition_response(plan: NutritionPlan) -> NutritionPlanResponse {
    NutritionPlanResponse {
        macro_calories: plan.macro_calories(),
        plan,
        success: true,
    }
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn get_training_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<TrainingPlanResponse>, ApiError> {
    let plan = state
        .repo
        .get_training_plan(session.user_id)
        .await?
        .ok_or(ApiError::NotFound("Training plan"))?;

    Ok(Json(training_response(plan)))
}

/// Replace the caller's active training plan
#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn upsert_training_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    body: Result<Json<UpsertTrainingPlan>, JsonRejection>,
) -> Result<Json<TrainingPlanResponse>, ApiError> {
    let Json(request) = body?;
    validate_training_plan(&request)?;

    let (Some(title), Some(start_date), Some(end_date)) =
        (request.title, request.start_date, request.end_date)
    else {
        return Err(ApiError::BadRequest("Incomplete training plan".to_string()));
    };

    let now = Utc::now();
    let plan = TrainingPlan {
        id: Uuid::new_v4(),
        user_id: session.user_id,
        title: title.trim().to_string(),
        goal: request.goal.filter(|g| !g.trim().is_empty()),
        start_date,
        end_date,
        plan_data: or_default(request.plan_data, json!({ "weeks": [] })),
        created_at: now,
        updated_at: now,
    };

    let saved = state.repo.upsert_training_plan(plan).await?;
    info!(plan_id = %saved.id, "Training plan saved");

    Ok(Json(training_response(saved)))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn get_nutrition_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<NutritionPlanResponse>, ApiError> {
    let plan = state
        .repo
        .get_nutrition_plan(session.user_id)
        .await?
        .ok_or(ApiError::NotFound("Nutrition plan"))?;

    Ok(Json(nutrition_response(plan)))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn upsert_nutrition_plan(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    body: Result<Json<UpsertNutritionPlan>, JsonRejection>,
) -> Result<Json<NutritionPlanResponse>, ApiError> {
    let Json(request) = body?;
    validate_nutrition_plan(&request)?;

    let now = Utc::now();
    let plan = NutritionPlan {
        id: Uuid::new_v4(),
        user_id: session.user_id,
        daily_calories: request.daily_calories.unwrap_or_default(),
        protein_g: request.protein_g,
        carbs_g: request.carbs_g,
        fat_g: request.fat_g,
        meals: or_default(request.meals, json!([])),
        notes: request.notes.filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };

    let saved = state.repo.upsert_nutrition_plan(plan).await?;
    info!(plan_id = %saved.id, "Nutrition plan saved");

    Ok(Json(nutrition_response(saved)))
}
