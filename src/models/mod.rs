// Data models for profiles, plans, calendar, activities and chat

pub mod user_profile;
pub mod training_plan;
pub mod nutrition_plan;
pub mod calendar_event;
pub mod strava_activity;
pub mod chat_message;
pub mod webhook_log;
pub mod validation;

pub use user_profile::*;
pub use training_plan::*;
pub use nutrition_plan::*;
pub use calendar_event::*;
pub use strava_activity::*;
pub use chat_message::*;
pub use webhook_log::*;
pub use validation::*;
