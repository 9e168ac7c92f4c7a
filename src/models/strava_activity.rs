use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 30;
pub const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StravaActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub strava_id: i64,
    pub name: String,
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    pub distance_m: f64,
    pub moving_time_s: i32,
    pub elevation_gain_m: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Activity as delivered by the Strava import, before it is bound to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStravaActivity {
    pub strava_id: i64,
    pub name: String,
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub moving_time_s: i32,
    pub elevation_gain_m: Option<f64>,
    pub average_heartrate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActivityTotals {
    pub count: usize,
    pub distance_km: f64,
    pub moving_hours: f64,
}

impl ActivityTotals {
    pub fn from_activities<'a>(activities: impl IntoIterator<Item = &'a StravaActivity>) -> Self {
        let mut totals = Self::default();
        let mut moving_seconds: i64 = 0;

        for activity in activities {
            totals.count += 1;
            totals.distance_km += activity.distance_m / 1000.0;
            moving_seconds += i64::from(activity.moving_time_s);
        }

        totals.distance_km = (totals.distance_km * 100.0).round() / 100.0;
        totals.moving_hours = (moving_seconds as f64 / 3600.0 * 100.0).round() / 100.0;
        totals
    }
}

/// Clamp a requested page size into `1..=MAX_ACTIVITY_LIMIT`.
pub fn clamp_activity_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}
