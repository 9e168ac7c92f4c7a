// HTTP surface: health, WhatsApp webhook, AI processing, user API and operator console

pub mod activities;
pub mod ai_processing;
pub mod calendar;
pub mod console;
pub mod dashboard;
pub mod errors;
pub mod health;
pub mod plans;
pub mod routes;
pub mod state;
pub mod user_profile;
pub mod webhook;

pub use errors::ApiError;
pub use routes::create_routes;
pub use state::AppState;
