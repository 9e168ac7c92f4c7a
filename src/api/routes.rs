use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::activities::activity_routes;
use super::ai_processing::ai_processing_routes;
use super::calendar::calendar_routes;
use super::console::console_routes;
use super::dashboard::dashboard_routes;
use super::health::health_check;
use super::plans::plan_routes;
use super::user_profile::user_profile_routes;
use super::webhook::webhook_routes;
use super::AppState;
use crate::auth::{cors_layer, security_headers_layer};

pub fn create_routes(state: AppState) -> Router {
    let jwt = state.jwt.clone();

    // Called by the automation and by the webhook itself, not by browsers
    let functions = Router::new()
        .merge(webhook_routes())
        .merge(ai_processing_routes());

    let api = Router::new()
        .merge(user_profile_routes(jwt.clone()))
        .merge(plan_routes(jwt.clone()))
        .merge(calendar_routes(jwt.clone()))
        .merge(activity_routes(jwt.clone()))
        .merge(dashboard_routes(jwt.clone()))
        .merge(console_routes(jwt));

    Router::new()
        .route("/health", get(health_check))
        .nest("/functions", functions)
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
        .with_state(state)
}
