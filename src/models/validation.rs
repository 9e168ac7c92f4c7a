use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    CreateCalendarEvent, UpsertNutritionPlan, UpsertTrainingPlan, UpsertUserProfile, EVENT_TYPES,
};
use crate::services::phone::normalize_phone;

pub const MAX_MESSAGE_LENGTH: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Collect every blank or absent field into a single error
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), ValidationError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| is_blank(*value))
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// Email validation
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::invalid("email", "Email cannot be empty"));
    }

    if !email.contains('@') || !email.contains('.') {
        return Err(ValidationError::invalid("email", "Invalid email format"));
    }

    if email.len() > 255 {
        return Err(ValidationError::invalid(
            "email",
            "Email cannot be longer than 255 characters",
        ));
    }

    Ok(())
}

pub fn validate_fitness_level(level: &str) -> Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "beginner" | "intermediate" | "advanced" => Ok(()),
        _ => Err(ValidationError::invalid(
            "fitness_level",
            "Must be one of: beginner, intermediate, advanced",
        )),
    }
}

pub fn validate_range(value: f64, min: f64, max: f64, field: &str) -> Result<(), ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::invalid(
            field,
            format!("Must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_training_days(days: i32) -> Result<(), ValidationError> {
    if !(1..=7).contains(&days) {
        return Err(ValidationError::invalid(
            "training_days_per_week",
            "Must be between 1 and 7",
        ));
    }
    Ok(())
}

/// Onboarding wizard / profile form
pub fn validate_profile(profile: &UpsertUserProfile) -> Result<(), ValidationError> {
    require_fields(&[
        ("full_name", profile.full_name.as_deref()),
        ("primary_goal", profile.primary_goal.as_deref()),
    ])?;

    if let Some(email) = profile.email.as_deref().filter(|e| !e.is_empty()) {
        validate_email(email)?;
    }

    if let Some(phone) = profile.phone.as_deref().filter(|p| !p.is_empty()) {
        if normalize_phone(phone).is_none() {
            return Err(ValidationError::invalid("phone", "Phone must contain digits"));
        }
    }

    if let Some(height) = profile.height_cm {
        validate_range(height, 100.0, 250.0, "height_cm")?;
    }

    if let Some(weight) = profile.weight_kg {
        validate_range(weight, 30.0, 300.0, "weight_kg")?;
    }

    if let Some(level) = profile
        .fitness_level
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        validate_fitness_level(level)?;
    }

    if let Some(days) = profile.training_days_per_week {
        validate_training_days(days)?;
    }

    Ok(())
}

pub fn validate_training_plan(plan: &UpsertTrainingPlan) -> Result<(), ValidationError> {
    let mut missing = vec![];
    if is_blank(plan.title.as_deref()) {
        missing.push("title".to_string());
    }
    if plan.start_date.is_none() {
        missing.push("start_date".to_string());
    }
    if plan.end_date.is_none() {
        missing.push("end_date".to_string());
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    if let (Some(start), Some(end)) = (plan.start_date, plan.end_date) {
        if end < start {
            return Err(ValidationError::invalid(
                "end_date",
                "End date must not be before start date",
            ));
        }
    }

    Ok(())
}

pub fn validate_nutrition_plan(plan: &UpsertNutritionPlan) -> Result<(), ValidationError> {
    let calories = plan
        .daily_calories
        .ok_or_else(|| ValidationError::MissingFields(vec!["daily_calories".to_string()]))?;

    if calories <= 0 {
        return Err(ValidationError::invalid("daily_calories", "Must be positive"));
    }

    for (field, value) in [
        ("protein_g", plan.protein_g),
        ("carbs_g", plan.carbs_g),
        ("fat_g", plan.fat_g),
    ] {
        if value < 0.0 {
            return Err(ValidationError::invalid(field, "Must not be negative"));
        }
    }

    Ok(())
}

pub fn validate_event_type(event_type: &str) -> Result<(), ValidationError> {
    if !EVENT_TYPES.contains(&event_type.to_lowercase().as_str()) {
        return Err(ValidationError::invalid(
            "event_type",
            format!("Must be one of: {}", EVENT_TYPES.join(", ")),
        ));
    }
    Ok(())
}

pub fn validate_event_times(
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if let Some(ends_at) = ends_at {
        if ends_at < starts_at {
            return Err(ValidationError::invalid(
                "ends_at",
                "Event cannot end before it starts",
            ));
        }
    }
    Ok(())
}

pub fn validate_calendar_event(event: &CreateCalendarEvent) -> Result<(), ValidationError> {
    let mut missing = vec![];
    if is_blank(event.title.as_deref()) {
        missing.push("title".to_string());
    }
    if event.starts_at.is_none() {
        missing.push("starts_at".to_string());
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    if let Some(event_type) = event.event_type.as_deref() {
        validate_event_type(event_type)?;
    }

    if let Some(starts_at) = event.starts_at {
        validate_event_times(starts_at, event.ends_at)?;
    }

    Ok(())
}

pub fn validate_message_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::MissingFields(vec!["content".to_string()]));
    }

    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::invalid(
            "content",
            format!("Message cannot be longer than {} characters", MAX_MESSAGE_LENGTH),
        ));
    }

    Ok(())
}
