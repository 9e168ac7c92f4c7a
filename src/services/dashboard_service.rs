use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{ActivityTotals, CalendarEvent, CalendarRange, StravaActivity};
use crate::store::Repository;

const UPCOMING_EVENTS: usize = 5;
const RECENT_ACTIVITIES: i64 = 5;
const WEEKLY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub onboarding_completed: bool,
    pub completion_percentage: f64,
    pub has_training_plan: bool,
    pub has_nutrition_plan: bool,
    pub upcoming_events: Vec<CalendarEvent>,
    pub recent_activities: Vec<StravaActivity>,
    pub weekly_totals: ActivityTotals,
    pub generated_at: DateTime<Utc>,
}

/// Aggregates the home-screen data for one user
pub struct DashboardService {
    repo: Arc<dyn Repository>,
}

impl DashboardService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn build(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Dashboard> {
        let profile = self.repo.get_profile(user_id).await?;
        let training_plan = self.repo.get_training_plan(user_id).await?;
        let nutrition_plan = self.repo.get_nutrition_plan(user_id).await?;

        let mut upcoming_events: Vec<CalendarEvent> = self
            .repo
            .list_events(
                user_id,
                CalendarRange {
                    from: Some(now),
                    to: None,
                },
            )
            .await?
            .into_iter()
            .filter(|e| !e.completed)
            .collect();
        upcoming_events.truncate(UPCOMING_EVENTS);

        let recent_activities = self.repo.list_activities(user_id, RECENT_ACTIVITIES).await?;
        let weekly = self
            .repo
            .activities_since(user_id, now - Duration::days(WEEKLY_WINDOW_DAYS))
            .await?;

        let (completion_percentage, _) = profile
            .as_ref()
            .map(|p| p.completion())
            .unwrap_or((0.0, vec![]));

        Ok(Dashboard {
            user_id,
            full_name: profile.as_ref().map(|p| p.full_name.clone()),
            onboarding_completed: profile.as_ref().map_or(false, |p| p.onboarding_completed),
            completion_percentage,
            has_training_plan: training_plan.is_some(),
            has_nutrition_plan: nutrition_plan.is_some(),
            upcoming_events,
            recent_activities,
            weekly_totals: ActivityTotals::from_activities(&weekly),
            generated_at: now,
        })
    }
}
