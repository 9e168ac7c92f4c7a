use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub fitness_level: Option<String>,
    pub primary_goal: String,
    pub training_days_per_week: Option<i32>,
    pub available_equipment: Vec<String>,
    pub injuries: Option<String>,
    pub dietary_restrictions: Vec<String>,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the onboarding wizard / profile form.
///
/// Every field is optional on the wire so that missing required fields can be
/// reported together instead of failing deserialization on the first one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpsertUserProfile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub fitness_level: Option<String>,
    pub primary_goal: Option<String>,
    pub training_days_per_week: Option<i32>,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    pub injuries: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub completion_percentage: f64,
    pub missing_fields: Vec<String>,
    pub success: bool,
}

impl UserProfile {
    /// Optional fields that count towards profile completion, with the name
    /// reported back to the client when they are empty.
    pub fn completion(&self) -> (f64, Vec<String>) {
        let checks: [(&str, bool); 8] = [
            ("email", self.email.is_some()),
            ("phone", self.phone.is_some()),
            ("birth_date", self.birth_date.is_some()),
            ("height", self.height_cm.is_some()),
            ("weight", self.weight_kg.is_some()),
            ("fitness_level", self.fitness_level.is_some()),
            ("training_days", self.training_days_per_week.is_some()),
            ("equipment", !self.available_equipment.is_empty()),
        ];

        // full_name and primary_goal are always present
        let total_fields = checks.len() + 2;
        let mut fields_filled = 2;
        let mut missing_fields = vec![];

        for (name, filled) in checks {
            if filled {
                fields_filled += 1;
            } else {
                missing_fields.push(name.to_string());
            }
        }

        let percentage = (fields_filled as f64 / total_fields as f64) * 100.0;
        (percentage.round(), missing_fields)
    }

    /// One-line description used as language-model context.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("Name: {}", self.full_name),
            format!("Goal: {}", self.primary_goal),
        ];

        if let Some(level) = &self.fitness_level {
            parts.push(format!("Level: {}", level));
        }
        if let Some(days) = self.training_days_per_week {
            parts.push(format!("Training days/week: {}", days));
        }
        if let Some(weight) = self.weight_kg {
            parts.push(format!("Weight: {:.1} kg", weight));
        }
        if let Some(height) = self.height_cm {
            parts.push(format!("Height: {:.0} cm", height));
        }
        if !self.available_equipment.is_empty() {
            parts.push(format!("Equipment: {}", self.available_equipment.join(", ")));
        }
        if let Some(injuries) = self.injuries.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(format!("Injuries: {}", injuries));
        }
        if !self.dietary_restrictions.is_empty() {
            parts.push(format!(
                "Dietary restrictions: {}",
                self.dietary_restrictions.join(", ")
            ));
        }

        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            full_name: "Ana Souza".to_string(),
            email: Some("ana@example.com".to_string()),
            phone: None,
            birth_date: None,
            gender: None,
            height_cm: Some(165.0),
            weight_kg: Some(62.5),
            fitness_level: Some("beginner".to_string()),
            primary_goal: "lose weight".to_string(),
            training_days_per_week: Some(3),
            available_equipment: vec![],
            injuries: None,
            dietary_restrictions: vec!["lactose".to_string()],
            onboarding_completed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_completion_reports_missing_fields() {
        let (percentage, missing) = profile().completion();

        assert_eq!(missing, vec!["phone", "birth_date", "equipment"]);
        assert_eq!(percentage, 70.0);
    }

    #[test]
    fn test_summary_includes_context() {
        let summary = profile().summary();

        assert!(summary.contains("Name: Ana Souza"));
        assert!(summary.contains("Goal: lose weight"));
        assert!(summary.contains("Weight: 62.5 kg"));
        assert!(summary.contains("Dietary restrictions: lactose"));
        assert!(!summary.contains("Injuries"));
    }
}
