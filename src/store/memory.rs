use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::models::{
    CalendarEvent, CalendarRange, ChatMessage, ConversationSummary, ImportStravaActivity,
    MessageDirection, NewChatMessage, NewWebhookLog, NutritionPlan, StravaActivity, TrainingPlan,
    UserProfile, WebhookLog, WebhookStatus,
};

#[derive(Debug, Default)]
struct MemoryState {
    profiles: HashMap<Uuid, UserProfile>,
    training_plans: HashMap<Uuid, TrainingPlan>,
    nutrition_plans: HashMap<Uuid, NutritionPlan>,
    events: Vec<CalendarEvent>,
    activities: Vec<StravaActivity>,
    messages: Vec<ChatMessage>,
    paused: HashMap<String, bool>,
    webhook_logs: Vec<WebhookLog>,
}

/// In-process store with the same upsert and uniqueness rules as the schema
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn foreign_ids(stored: &[StravaActivity], user_id: Uuid, strava_ids: &[i64]) -> Vec<i64> {
    stored
        .iter()
        .filter(|a| a.user_id != user_id && strava_ids.contains(&a.strava_id))
        .map(|a| a.strava_id)
        .collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn find_profile_by_phone(&self, phone: &str) -> Result<Option<UserProfile>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .values()
            .find(|p| p.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn upsert_profile(&self, mut profile: UserProfile) -> Result<UserProfile> {
        let mut state = self.state.write().await;

        if let Some(phone) = profile.phone.as_deref() {
            let taken = state
                .profiles
                .values()
                .any(|p| p.user_id != profile.user_id && p.phone.as_deref() == Some(phone));
            if taken {
                bail!("duplicate key value violates unique constraint \"user_profiles_phone_key\"");
            }
        }

        if let Some(existing) = state.profiles.get(&profile.user_id) {
            profile.created_at = existing.created_at;
        }
        state.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn get_training_plan(&self, user_id: Uuid) -> Result<Option<TrainingPlan>> {
        Ok(self.state.read().await.training_plans.get(&user_id).cloned())
    }

    async fn upsert_training_plan(&self, mut plan: TrainingPlan) -> Result<TrainingPlan> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.training_plans.get(&plan.user_id) {
            plan.id = existing.id;
            plan.created_at = existing.created_at;
        }
        state.training_plans.insert(plan.user_id, plan.clone());
        Ok(plan)
    }

    async fn get_nutrition_plan(&self, user_id: Uuid) -> Result<Option<NutritionPlan>> {
        Ok(self.state.read().await.nutrition_plans.get(&user_id).cloned())
    }

    async fn upsert_nutrition_plan(&self, mut plan: NutritionPlan) -> Result<NutritionPlan> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.nutrition_plans.get(&plan.user_id) {
            plan.id = existing.id;
            plan.created_at = existing.created_at;
        }
        state.nutrition_plans.insert(plan.user_id, plan.clone());
        Ok(plan)
    }

    async fn list_events(&self, user_id: Uuid, range: CalendarRange) -> Result<Vec<CalendarEvent>> {
        let state = self.state.read().await;
        let mut events: Vec<CalendarEvent> = state
            .events
            .iter()
            .filter(|e| e.user_id == user_id && range.contains(e.starts_at))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<CalendarEvent>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .find(|e| e.id == event_id && e.user_id == user_id)
            .cloned())
    }

    async fn insert_event(&self, event: CalendarEvent) -> Result<CalendarEvent> {
        self.state.write().await.events.push(event.clone());
        Ok(event)
    }

    async fn update_event(&self, event: CalendarEvent) -> Result<Option<CalendarEvent>> {
        let mut state = self.state.write().await;
        match state
            .events
            .iter_mut()
            .find(|e| e.id == event.id && e.user_id == event.user_id)
        {
            Some(slot) => {
                *slot = event.clone();
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    async fn delete_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.events.len();
        state
            .events
            .retain(|e| !(e.id == event_id && e.user_id == user_id));
        Ok(state.events.len() < before)
    }

    async fn list_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<StravaActivity>> {
        let state = self.state.read().await;
        let mut activities: Vec<StravaActivity> = state
            .activities
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        activities.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(activities)
    }

    async fn activities_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<StravaActivity>> {
        let state = self.state.read().await;
        let mut activities: Vec<StravaActivity> = state
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && a.start_date >= since)
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(activities)
    }

    async fn foreign_strava_ids(&self, user_id: Uuid, strava_ids: &[i64]) -> Result<Vec<i64>> {
        let state = self.state.read().await;
        Ok(foreign_ids(&state.activities, user_id, strava_ids))
    }

    async fn import_activities(
        &self,
        user_id: Uuid,
        activities: Vec<ImportStravaActivity>,
    ) -> Result<Vec<StravaActivity>> {
        let mut state = self.state.write().await;

        let strava_ids: Vec<i64> = activities.iter().map(|a| a.strava_id).collect();
        let foreign = foreign_ids(&state.activities, user_id, &strava_ids);
        if !foreign.is_empty() {
            bail!("Strava activities {:?} belong to another user", foreign);
        }

        let mut saved = Vec::with_capacity(activities.len());
        for activity in activities {
            if let Some(existing) = state
                .activities
                .iter_mut()
                .find(|a| a.strava_id == activity.strava_id)
            {
                existing.name = activity.name;
                existing.sport_type = activity.sport_type;
                existing.start_date = activity.start_date;
                existing.distance_m = activity.distance_m;
                existing.moving_time_s = activity.moving_time_s;
                existing.elevation_gain_m = activity.elevation_gain_m;
                existing.average_heartrate = activity.average_heartrate;
                saved.push(existing.clone());
                continue;
            }

            let stored = StravaActivity {
                id: Uuid::new_v4(),
                user_id,
                strava_id: activity.strava_id,
                name: activity.name,
                sport_type: activity.sport_type,
                start_date: activity.start_date,
                distance_m: activity.distance_m,
                moving_time_s: activity.moving_time_s,
                elevation_gain_m: activity.elevation_gain_m,
                average_heartrate: activity.average_heartrate,
                created_at: Utc::now(),
            };
            state.activities.push(stored.clone());
            saved.push(stored);
        }

        Ok(saved)
    }

    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let message = message.into_message();
        self.state.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        phone: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.phone == phone && since.map_or(true, |since| m.created_at > since))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);

        let limit = usize::try_from(limit).unwrap_or(0);
        if since.is_some() {
            messages.truncate(limit);
            Ok(messages)
        } else {
            let skip = messages.len().saturating_sub(limit);
            Ok(messages.split_off(skip))
        }
    }

    async fn recent_messages(&self, phone: &str, limit: i64) -> Result<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.phone == phone)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        let skip = messages
            .len()
            .saturating_sub(usize::try_from(limit).unwrap_or(0));
        Ok(messages.split_off(skip))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let state = self.state.read().await;
        let mut summaries: HashMap<&str, ConversationSummary> = HashMap::new();

        for message in &state.messages {
            let unread = i64::from(
                message.direction == MessageDirection::Inbound && message.read_at.is_none(),
            );

            match summaries.get_mut(message.phone.as_str()) {
                Some(summary) => {
                    summary.unread_count += unread;
                    if message.created_at >= summary.last_message_at {
                        summary.last_message = message.content.clone();
                        summary.last_direction = message.direction;
                        summary.last_message_at = message.created_at;
                    }
                }
                None => {
                    let profile = state
                        .profiles
                        .values()
                        .find(|p| p.phone.as_deref() == Some(message.phone.as_str()));
                    summaries.insert(
                        message.phone.as_str(),
                        ConversationSummary {
                            phone: message.phone.clone(),
                            contact_name: profile.map(|p| p.full_name.clone()),
                            user_id: profile.map(|p| p.user_id),
                            last_message: message.content.clone(),
                            last_direction: message.direction,
                            last_message_at: message.created_at,
                            unread_count: unread,
                            ai_paused: state.paused.get(&message.phone).copied().unwrap_or(false),
                        },
                    );
                }
            }
        }

        let mut summaries: Vec<ConversationSummary> = summaries.into_values().collect();
        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(summaries)
    }

    async fn mark_read(&self, phone: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut updated = 0;

        for message in state.messages.iter_mut().filter(|m| {
            m.phone == phone && m.direction == MessageDirection::Inbound && m.read_at.is_none()
        }) {
            message.read_at = Some(now);
            updated += 1;
        }

        Ok(updated)
    }

    async fn set_ai_paused(&self, phone: &str, paused: bool) -> Result<()> {
        self.state
            .write()
            .await
            .paused
            .insert(phone.to_string(), paused);
        Ok(())
    }

    async fn is_ai_paused(&self, phone: &str) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .paused
            .get(phone)
            .copied()
            .unwrap_or(false))
    }

    async fn insert_webhook_log(&self, log: NewWebhookLog) -> Result<WebhookLog> {
        let log = log.into_log();
        self.state.write().await.webhook_logs.push(log.clone());
        Ok(log)
    }

    async fn update_webhook_status(
        &self,
        log_id: Uuid,
        status: WebhookStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        match state.webhook_logs.iter_mut().find(|l| l.id == log_id) {
            Some(log) => {
                log.status = status;
                log.error_message = error_message;
                log.updated_at = Utc::now();
                Ok(())
            }
            None => bail!("Webhook log {} not found", log_id),
        }
    }

    async fn list_webhook_logs(&self, limit: i64) -> Result<Vec<WebhookLog>> {
        let state = self.state.read().await;
        let mut logs = state.webhook_logs.clone();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(logs)
    }
}
