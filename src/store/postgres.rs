use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::Repository;
use crate::models::{
    CalendarEvent, CalendarRange, ChatMessage, ConversationSummary, ImportStravaActivity,
    MessageDirection, MessageSender, NewChatMessage, NewWebhookLog, NutritionPlan, StravaActivity,
    TrainingPlan, UserProfile, WebhookLog, WebhookStatus,
};

const PROFILE_COLUMNS: &str = "user_id, full_name, email, phone, birth_date, gender, height_cm, \
     weight_kg, fitness_level, primary_goal, training_days_per_week, available_equipment, \
     injuries, dietary_restrictions, onboarding_completed, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, phone, user_id, direction, sender, content, instance, created_at, read_at";

const WEBHOOK_LOG_COLUMNS: &str = "id, remote_jid, phone, instance, payload, status, \
     error_message, created_at, updated_at";

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unexpected value {:?}", value).into(),
    }
}

impl<'r> FromRow<'r, PgRow> for ChatMessage {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let direction: String = row.try_get("direction")?;
        let sender: String = row.try_get("sender")?;

        Ok(ChatMessage {
            id: row.try_get("id")?,
            phone: row.try_get("phone")?,
            user_id: row.try_get("user_id")?,
            direction: MessageDirection::from_str(&direction)
                .ok_or_else(|| decode_error("direction", &direction))?,
            sender: MessageSender::from_str(&sender).ok_or_else(|| decode_error("sender", &sender))?,
            content: row.try_get("content")?,
            instance: row.try_get("instance")?,
            created_at: row.try_get("created_at")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for WebhookLog {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;

        Ok(WebhookLog {
            id: row.try_get("id")?,
            remote_jid: row.try_get("remote_jid")?,
            phone: row.try_get("phone")?,
            instance: row.try_get("instance")?,
            payload: row.try_get("payload")?,
            status: WebhookStatus::from_str(&status).ok_or_else(|| decode_error("status", &status))?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ConversationSummary {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let direction: String = row.try_get("last_direction")?;

        Ok(ConversationSummary {
            phone: row.try_get("phone")?,
            contact_name: row.try_get("contact_name")?,
            user_id: row.try_get("user_id")?,
            last_message: row.try_get("last_message")?,
            last_direction: MessageDirection::from_str(&direction)
                .ok_or_else(|| decode_error("last_direction", &direction))?,
            last_message_at: row.try_get("last_message_at")?,
            unread_count: row.try_get("unread_count")?,
            ai_paused: row.try_get("ai_paused")?,
        })
    }
}

/// Postgres-backed repository
#[derive(Debug, Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn find_profile_by_phone(&self, phone: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles WHERE phone = $1",
            PROFILE_COLUMNS
        ))
        .bind(phone)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        let stored = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO user_profiles ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (user_id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                birth_date = EXCLUDED.birth_date,
                gender = EXCLUDED.gender,
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                fitness_level = EXCLUDED.fitness_level,
                primary_goal = EXCLUDED.primary_goal,
                training_days_per_week = EXCLUDED.training_days_per_week,
                available_equipment = EXCLUDED.available_equipment,
                injuries = EXCLUDED.injuries,
                dietary_restrictions = EXCLUDED.dietary_restrictions,
                onboarding_completed = EXCLUDED.onboarding_completed,
                updated_at = EXCLUDED.updated_at
            RETURNING {columns}
            "#,
            columns = PROFILE_COLUMNS
        ))
        .bind(profile.user_id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(profile.birth_date)
        .bind(&profile.gender)
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(&profile.fitness_level)
        .bind(&profile.primary_goal)
        .bind(profile.training_days_per_week)
        .bind(&profile.available_equipment)
        .bind(&profile.injuries)
        .bind(&profile.dietary_restrictions)
        .bind(profile.onboarding_completed)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn get_training_plan(&self, user_id: Uuid) -> Result<Option<TrainingPlan>> {
        let plan = sqlx::query_as::<_, TrainingPlan>(
            "SELECT id, user_id, title, goal, start_date, end_date, plan_data, created_at, updated_at
             FROM training_plans WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(plan)
    }

    async fn upsert_training_plan(&self, plan: TrainingPlan) -> Result<TrainingPlan> {
        let stored = sqlx::query_as::<_, TrainingPlan>(
            r#"
            INSERT INTO training_plans (id, user_id, title, goal, start_date, end_date, plan_data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                title = EXCLUDED.title,
                goal = EXCLUDED.goal,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                plan_data = EXCLUDED.plan_data,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, title, goal, start_date, end_date, plan_data, created_at, updated_at
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(&plan.title)
        .bind(&plan.goal)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(&plan.plan_data)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn get_nutrition_plan(&self, user_id: Uuid) -> Result<Option<NutritionPlan>> {
        let plan = sqlx::query_as::<_, NutritionPlan>(
            "SELECT id, user_id, daily_calories, protein_g, carbs_g, fat_g, meals, notes, created_at, updated_at
             FROM nutrition_plans WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(plan)
    }

    async fn upsert_nutrition_plan(&self, plan: NutritionPlan) -> Result<NutritionPlan> {
        let stored = sqlx::query_as::<_, NutritionPlan>(
            r#"
            INSERT INTO nutrition_plans (id, user_id, daily_calories, protein_g, carbs_g, fat_g, meals, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                daily_calories = EXCLUDED.daily_calories,
                protein_g = EXCLUDED.protein_g,
                carbs_g = EXCLUDED.carbs_g,
                fat_g = EXCLUDED.fat_g,
                meals = EXCLUDED.meals,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, daily_calories, protein_g, carbs_g, fat_g, meals, notes, created_at, updated_at
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(plan.daily_calories)
        .bind(plan.protein_g)
        .bind(plan.carbs_g)
        .bind(plan.fat_g)
        .bind(&plan.meals)
        .bind(&plan.notes)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn list_events(&self, user_id: Uuid, range: CalendarRange) -> Result<Vec<CalendarEvent>> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            "SELECT id, user_id, title, event_type, starts_at, ends_at, notes, completed, created_at, updated_at
             FROM calendar_events
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR starts_at >= $2)
               AND ($3::timestamptz IS NULL OR starts_at <= $3)
             ORDER BY starts_at ASC",
        )
        .bind(user_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.db)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<CalendarEvent>> {
        let event = sqlx::query_as::<_, CalendarEvent>(
            "SELECT id, user_id, title, event_type, starts_at, ends_at, notes, completed, created_at, updated_at
             FROM calendar_events WHERE id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(event)
    }

    async fn insert_event(&self, event: CalendarEvent) -> Result<CalendarEvent> {
        let stored = sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (id, user_id, title, event_type, starts_at, ends_at, notes, completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, title, event_type, starts_at, ends_at, notes, completed, created_at, updated_at
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.event_type)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.notes)
        .bind(event.completed)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn update_event(&self, event: CalendarEvent) -> Result<Option<CalendarEvent>> {
        let stored = sqlx::query_as::<_, CalendarEvent>(
            r#"
            UPDATE calendar_events
            SET title = $3, event_type = $4, starts_at = $5, ends_at = $6,
                notes = $7, completed = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, event_type, starts_at, ends_at, notes, completed, created_at, updated_at
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.event_type)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.notes)
        .bind(event.completed)
        .bind(event.updated_at)
        .fetch_optional(&self.db)
        .await?;

        Ok(stored)
    }

    async fn delete_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_activities(&self, user_id: Uuid, limit: i64) -> Result<Vec<StravaActivity>> {
        let activities = sqlx::query_as::<_, StravaActivity>(
            "SELECT id, user_id, strava_id, name, sport_type, start_date, distance_m, moving_time_s,
                    elevation_gain_m, average_heartrate, created_at
             FROM strava_activities WHERE user_id = $1
             ORDER BY start_date DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }

    async fn activities_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<StravaActivity>> {
        let activities = sqlx::query_as::<_, StravaActivity>(
            "SELECT id, user_id, strava_id, name, sport_type, start_date, distance_m, moving_time_s,
                    elevation_gain_m, average_heartrate, created_at
             FROM strava_activities WHERE user_id = $1 AND start_date >= $2
             ORDER BY start_date DESC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }

    async fn foreign_strava_ids(&self, user_id: Uuid, strava_ids: &[i64]) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT strava_id FROM strava_activities WHERE strava_id = ANY($1) AND user_id <> $2",
        )
        .bind(strava_ids)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    async fn import_activities(
        &self,
        user_id: Uuid,
        activities: Vec<ImportStravaActivity>,
    ) -> Result<Vec<StravaActivity>> {
        let mut tx = self.db.begin().await?;
        let mut saved = Vec::with_capacity(activities.len());

        for activity in activities {
            let strava_id = activity.strava_id;
            let stored = sqlx::query_as::<_, StravaActivity>(
                r#"
                INSERT INTO strava_activities (id, user_id, strava_id, name, sport_type, start_date, distance_m,
                                               moving_time_s, elevation_gain_m, average_heartrate, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
                ON CONFLICT (strava_id) DO UPDATE SET
                    name = EXCLUDED.name,
                    sport_type = EXCLUDED.sport_type,
                    start_date = EXCLUDED.start_date,
                    distance_m = EXCLUDED.distance_m,
                    moving_time_s = EXCLUDED.moving_time_s,
                    elevation_gain_m = EXCLUDED.elevation_gain_m,
                    average_heartrate = EXCLUDED.average_heartrate
                WHERE strava_activities.user_id = EXCLUDED.user_id
                RETURNING id, user_id, strava_id, name, sport_type, start_date, distance_m, moving_time_s,
                          elevation_gain_m, average_heartrate, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(activity.strava_id)
            .bind(activity.name)
            .bind(activity.sport_type)
            .bind(activity.start_date)
            .bind(activity.distance_m)
            .bind(activity.moving_time_s)
            .bind(activity.elevation_gain_m)
            .bind(activity.average_heartrate)
            .fetch_optional(&mut *tx)
            .await?;

            // Dropping `tx` on the early return rolls the batch back
            let stored = stored
                .ok_or_else(|| anyhow!("Strava activity {} belongs to another user", strava_id))?;
            saved.push(stored);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn insert_message(&self, message: NewChatMessage) -> Result<ChatMessage> {
        let message = message.into_message();
        let stored = sqlx::query_as::<_, ChatMessage>(&format!(
            "INSERT INTO chat_messages ({columns})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {columns}",
            columns = MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(&message.phone)
        .bind(message.user_id)
        .bind(message.direction.as_str())
        .bind(message.sender.as_str())
        .bind(&message.content)
        .bind(&message.instance)
        .bind(message.created_at)
        .bind(message.read_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn list_messages(
        &self,
        phone: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>> {
        let Some(since) = since else {
            return self.recent_messages(phone, limit).await;
        };

        let messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {} FROM chat_messages
             WHERE phone = $1 AND created_at > $2
             ORDER BY created_at ASC LIMIT $3",
            MESSAGE_COLUMNS
        ))
        .bind(phone)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(messages)
    }

    async fn recent_messages(&self, phone: &str, limit: i64) -> Result<Vec<ChatMessage>> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {} FROM chat_messages WHERE phone = $1 ORDER BY created_at DESC LIMIT $2",
            MESSAGE_COLUMNS
        ))
        .bind(phone)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let conversations = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT c.phone,
                   p.full_name AS contact_name,
                   p.user_id,
                   c.last_message,
                   c.last_direction,
                   c.last_message_at,
                   COALESCE(u.unread, 0) AS unread_count,
                   COALESCE(s.ai_paused, FALSE) AS ai_paused
            FROM (
                SELECT DISTINCT ON (phone)
                       phone, content AS last_message, direction AS last_direction,
                       created_at AS last_message_at
                FROM chat_messages
                ORDER BY phone, created_at DESC
            ) c
            LEFT JOIN (
                SELECT phone, COUNT(*) AS unread
                FROM chat_messages
                WHERE direction = 'inbound' AND read_at IS NULL
                GROUP BY phone
            ) u ON u.phone = c.phone
            LEFT JOIN user_profiles p ON p.phone = c.phone
            LEFT JOIN conversation_settings s ON s.phone = c.phone
            ORDER BY c.last_message_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(conversations)
    }

    async fn mark_read(&self, phone: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE chat_messages SET read_at = NOW()
             WHERE phone = $1 AND direction = 'inbound' AND read_at IS NULL",
        )
        .bind(phone)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn set_ai_paused(&self, phone: &str, paused: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO conversation_settings (phone, ai_paused, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (phone) DO UPDATE SET ai_paused = $2, updated_at = NOW()",
        )
        .bind(phone)
        .bind(paused)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn is_ai_paused(&self, phone: &str) -> Result<bool> {
        let row = sqlx::query("SELECT ai_paused FROM conversation_settings WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.db)
            .await?;

        let paused = row.map(|r| r.try_get::<bool, _>("ai_paused")).transpose()?;
        Ok(paused.unwrap_or(false))
    }

    async fn insert_webhook_log(&self, log: NewWebhookLog) -> Result<WebhookLog> {
        let log = log.into_log();
        let stored = sqlx::query_as::<_, WebhookLog>(&format!(
            "INSERT INTO webhook_logs ({columns})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {columns}",
            columns = WEBHOOK_LOG_COLUMNS
        ))
        .bind(log.id)
        .bind(&log.remote_jid)
        .bind(&log.phone)
        .bind(&log.instance)
        .bind(&log.payload)
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.created_at)
        .bind(log.updated_at)
        .fetch_one(&self.db)
        .await?;

        Ok(stored)
    }

    async fn update_webhook_status(
        &self,
        log_id: Uuid,
        status: WebhookStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE webhook_logs SET status = $2, error_message = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(log_id)
        .bind(status.as_str())
        .bind(error_message)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Webhook log {} not found", log_id));
        }

        Ok(())
    }

    async fn list_webhook_logs(&self, limit: i64) -> Result<Vec<WebhookLog>> {
        let logs = sqlx::query_as::<_, WebhookLog>(&format!(
            "SELECT {} FROM webhook_logs ORDER BY created_at DESC LIMIT $1",
            WEBHOOK_LOG_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }
}
