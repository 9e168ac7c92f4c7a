use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const EVENT_TYPES: [&str; 5] = ["workout", "nutrition", "checkin", "race", "other"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub event_type: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCalendarEvent {
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Partial update. For `ends_at` and `notes`, an explicit `null` clears the
/// stored value while a missing key leaves it alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCalendarEvent {
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    pub completed: Option<bool>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl CalendarEvent {
    pub fn apply(&mut self, update: UpdateCalendarEvent) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(event_type) = update.event_type {
            self.event_type = event_type;
        }
        if let Some(starts_at) = update.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = update.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(notes) = update.notes {
            self.notes = notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CalendarRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl CalendarRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> CalendarEvent {
        let now = Utc::now();
        CalendarEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Long run".to_string(),
            event_type: "workout".to_string(),
            starts_at: now,
            ends_at: Some(now + chrono::Duration::hours(2)),
            notes: Some("Bring gels".to_string()),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_trims_title_and_keeps_missing_fields() {
        let mut event = event();
        let update: UpdateCalendarEvent =
            serde_json::from_value(json!({ "title": "  Tempo run  " })).unwrap();

        event.apply(update);

        assert_eq!(event.title, "Tempo run");
        assert!(event.ends_at.is_some());
        assert_eq!(event.notes.as_deref(), Some("Bring gels"));
    }

    #[test]
    fn test_apply_null_clears_optional_fields() {
        let mut event = event();
        let update: UpdateCalendarEvent =
            serde_json::from_value(json!({ "ends_at": null, "notes": null })).unwrap();

        event.apply(update);

        assert_eq!(event.ends_at, None);
        assert_eq!(event.notes, None);
    }
}
