use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::*;
use crate::store::Repository;

pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);
pub const DEMO_PHONE: &str = "5511999990001";

/// Writes a small, idempotent demo data set for local development
pub struct DatabaseSeeder {
    repo: Arc<dyn Repository>,
}

impl DatabaseSeeder {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting database seeding...");

        self.seed_profile().await?;
        self.seed_training_plan().await?;
        self.seed_nutrition_plan().await?;
        self.seed_calendar().await?;
        self.seed_activities().await?;
        self.seed_conversation().await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    async fn seed_profile(&self) -> Result<()> {
        if self.repo.get_profile(DEMO_USER_ID).await?.is_some() {
            return Ok(());
        }

        let now = Utc::now();
        self.repo
            .upsert_profile(UserProfile {
                user_id: DEMO_USER_ID,
                full_name: "Demo Athlete".to_string(),
                email: Some("demo.athlete@example.com".to_string()),
                phone: Some(DEMO_PHONE.to_string()),
                birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
                gender: Some("female".to_string()),
                height_cm: Some(168.0),
                weight_kg: Some(64.0),
                fitness_level: Some("intermediate".to_string()),
                primary_goal: "Run a half marathon".to_string(),
                training_days_per_week: Some(4),
                available_equipment: vec!["dumbbells".to_string(), "resistance bands".to_string()],
                injuries: None,
                dietary_restrictions: vec!["vegetarian".to_string()],
                onboarding_completed: true,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!("Created demo profile");
        Ok(())
    }

    async fn seed_training_plan(&self) -> Result<()> {
        if self.repo.get_training_plan(DEMO_USER_ID).await?.is_some() {
            return Ok(());
        }

        let today = Utc::now().date_naive();
        let now = Utc::now();
        self.repo
            .upsert_training_plan(TrainingPlan {
                id: Uuid::new_v4(),
                user_id: DEMO_USER_ID,
                title: "Half marathon build".to_string(),
                goal: Some("Finish 21k under 2h".to_string()),
                start_date: today,
                end_date: today + Duration::weeks(12),
                plan_data: json!({
                    "weeks": [
                        {
                            "week_number": 1,
                            "workouts": [
                                {"day": "Monday", "type": "rest"},
                                {"day": "Tuesday", "type": "easy_run", "duration": 40},
                                {"day": "Wednesday", "type": "strength", "duration": 30},
                                {"day": "Thursday", "type": "intervals", "duration": 45},
                                {"day": "Saturday", "type": "long_run", "duration": 75}
                            ]
                        }
                    ]
                }),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!("Created demo training plan");
        Ok(())
    }

    async fn seed_nutrition_plan(&self) -> Result<()> {
        if self.repo.get_nutrition_plan(DEMO_USER_ID).await?.is_some() {
            return Ok(());
        }

        let now = Utc::now();
        self.repo
            .upsert_nutrition_plan(NutritionPlan {
                id: Uuid::new_v4(),
                user_id: DEMO_USER_ID,
                daily_calories: 2100,
                protein_g: 110.0,
                carbs_g: 270.0,
                fat_g: 65.0,
                meals: json!([
                    {"name": "Breakfast", "items": ["oats", "banana", "greek yogurt"]},
                    {"name": "Lunch", "items": ["lentils", "rice", "salad"]},
                    {"name": "Dinner", "items": ["tofu stir fry", "quinoa"]}
                ]),
                notes: Some("Extra carbs on long-run days".to_string()),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!("Created demo nutrition plan");
        Ok(())
    }

    async fn seed_calendar(&self) -> Result<()> {
        let existing = self
            .repo
            .list_events(DEMO_USER_ID, CalendarRange::default())
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        for (title, event_type, offset_days) in [
            ("Intervals 6x800m", "workout", 1),
            ("Weekly check-in", "checkin", 3),
            ("Long run 14k", "workout", 5),
        ] {
            let starts_at = now + Duration::days(offset_days);
            self.repo
                .insert_event(CalendarEvent {
                    id: Uuid::new_v4(),
                    user_id: DEMO_USER_ID,
                    title: title.to_string(),
                    event_type: event_type.to_string(),
                    starts_at,
                    ends_at: Some(starts_at + Duration::hours(1)),
                    notes: None,
                    completed: false,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }

        tracing::info!("Created demo calendar events");
        Ok(())
    }

    async fn seed_activities(&self) -> Result<()> {
        let now = Utc::now();
        let activities = [
            (900_000_001_i64, "Easy recovery run", 1, 6_200.0, 2_160),
            (900_000_002, "Tempo run", 3, 8_000.0, 2_520),
            (900_000_003, "Sunday long run", 6, 15_300.0, 5_580),
        ]
        .into_iter()
        .map(|(strava_id, name, days_ago, distance_m, moving_time_s)| ImportStravaActivity {
            strava_id,
            name: name.to_string(),
            sport_type: "Run".to_string(),
            start_date: now - Duration::days(days_ago),
            distance_m,
            moving_time_s,
            elevation_gain_m: Some(42.0),
            average_heartrate: Some(148.0),
        })
        .collect();

        self.repo.import_activities(DEMO_USER_ID, activities).await?;

        tracing::info!("Upserted demo Strava activities");
        Ok(())
    }

    async fn seed_conversation(&self) -> Result<()> {
        if !self.repo.recent_messages(DEMO_PHONE, 1).await?.is_empty() {
            return Ok(());
        }

        for (sender, content) in [
            (MessageSender::User, "Bom dia! Posso trocar o treino de hoje por amanhã?"),
            (
                MessageSender::Ai,
                "Bom dia! Pode sim. Faça um trote leve de 20 minutos hoje para manter a rotina.",
            ),
        ] {
            self.repo
                .insert_message(NewChatMessage {
                    phone: DEMO_PHONE.to_string(),
                    user_id: Some(DEMO_USER_ID),
                    sender,
                    content: content.to_string(),
                    instance: Some("demo".to_string()),
                })
                .await?;
        }

        tracing::info!("Created demo conversation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let repo = Arc::new(MemoryRepository::new());
        let seeder = DatabaseSeeder::new(repo.clone());

        seeder.seed_all().await.unwrap();
        seeder.seed_all().await.unwrap();

        let profile = repo.find_profile_by_phone(DEMO_PHONE).await.unwrap().unwrap();
        assert_eq!(profile.user_id, DEMO_USER_ID);
        assert_eq!(
            repo.list_events(DEMO_USER_ID, CalendarRange::default()).await.unwrap().len(),
            3
        );
        assert_eq!(repo.list_activities(DEMO_USER_ID, 10).await.unwrap().len(), 3);

        let conversations = repo.list_conversations().await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].contact_name.as_deref(), Some("Demo Athlete"));
    }
}
