//! Data-access layer.
//!
//! Handlers talk to a [`Repository`]; `PgRepository` backs it with Postgres and
//! `MemoryRepository` keeps everything in process for local runs and tests.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    CalendarEvent, CalendarRange, ChatMessage, ConversationSummary, ImportStravaActivity,
    NewChatMessage, NewWebhookLog, NutritionPlan, StravaActivity, TrainingPlan, UserProfile,
    WebhookLog, WebhookStatus,
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Cheap round trip used by the health check
    async fn ping(&self) -> Result<()>;

    // Profiles
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>>;
    async fn find_profile_by_phone(&self, phone: &str) -> Result<Option<UserProfile>>;
    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile>;

    // Plans
    async fn get_training_plan(&self, user_id: Uuid) -> Result<Option<TrainingPlan>>;
    async fn upsert_training_plan(&self, plan: TrainingPlan) -> Result<TrainingPlan>;
    async fn get_nutrition_plan(&self, user_id: Uuid) -> Result<Option<NutritionPlan>>;
    async fn upsert_nutrition_plan(&self, plan: NutritionPlan) -> Result<NutritionPlan>;

    // Calendar
    async fn list_events(&self, user_id: Uuid, range: CalendarRange) -> Result<Vec<CalendarEvent>>;
    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<CalendarEvent>>;
    async fn insert_event(&self, event: CalendarEvent) -> Result<CalendarEvent>;
    async fn update_event(&self, event: CalendarEvent) -> Result<Option<CalendarEvent>>;
    async fn delete_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool>;

    // Strava activities
    async fn list_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<StravaActivity>>;
    async fn activities_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<StravaActivity>>;
    /// Strava ids from `strava_ids` already stored for a different user
    async fn foreign_strava_ids(&self, user_id: Uuid, strava_ids: &[i64]) -> Result<Vec<i64>>;
    /// Upsert a batch keyed by Strava id; all rows are written or none are
    async fn import_activities(
        &self,
        user_id: Uuid,
        activities: Vec<ImportStravaActivity>,
    ) -> Result<Vec<StravaActivity>>;

    // Chat
    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage>;
    /// Without `since`, the newest `limit` messages; with it, the first `limit` after it.
    /// Both come back oldest first.
    async fn list_messages(
        &self,
        phone: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>>;
    /// Most recent `limit` messages for a phone, returned oldest first
    async fn recent_messages(&self, phone: &str, limit: i64) -> Result<Vec<ChatMessage>>;
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>>;
    async fn mark_read(&self, phone: &str) -> Result<u64>;
    async fn set_ai_paused(&self, phone: &str, paused: bool) -> Result<()>;
    async fn is_ai_paused(&self, phone: &str) -> Result<bool>;

    // Webhook audit log
    async fn insert_webhook_log(&self, log: NewWebhookLog) -> Result<WebhookLog>;
    async fn update_webhook_status(
        &self,
        log_id: Uuid,
        status: WebhookStatus,
        error_message: Option<String>,
    ) -> Result<()>;
    async fn list_webhook_logs(&self, limit: i64) -> Result<Vec<WebhookLog>>;
}
