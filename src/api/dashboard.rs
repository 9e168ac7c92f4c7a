use axum::{
    extract::State, middleware, response::Json, routing::get, Extension, Router,
};
use chrono::Utc;
use tracing::instrument;

use super::{ApiError, AppState};
use crate::auth::{jwt_auth_middleware, JwtService, UserSession};
use crate::services::Dashboard;

pub fn dashboard_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = state.dashboard().build(session.user_id, Utc::now()).await?;
    Ok(Json(dashboard))
}
