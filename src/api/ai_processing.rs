use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::auth::{extract_bearer_token, AuthError};
use crate::models::{require_fields, ValidationError};
use crate::services::phone::{is_group_jid, normalize_phone};
use crate::services::{CoachingOutcome, ForwardRequest};

/// Body accepted by the AI-processing function
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessMessageRequest {
    pub phone: Option<String>,
    pub message: Option<String>,
    pub instancia: Option<String>,
    pub conversation: Option<String>,
    pub log_id: Option<Uuid>,
    #[serde(default)]
    pub is_group: bool,
}

#[derive(Debug, Serialize)]
pub struct ProcessMessageResponse {
    pub success: bool,
    pub phone: String,
    pub ai_skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub inbound_id: Uuid,
    pub reply: Option<String>,
    pub message_id: Option<Uuid>,
    pub delivered: bool,
}

pub fn ai_processing_routes() -> Router<AppState> {
    Router::new().route("/process-message", post(process_message))
}

#[instrument(skip_all)]
pub async fn process_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ProcessMessageRequest>, JsonRejection>,
) -> Result<Json<ProcessMessageResponse>, ApiError> {
    verify_service_key(state.config.service_key.as_deref(), &headers)?;

    let Json(request) = body?;
    require_fields(&[
        ("phone", request.phone.as_deref()),
        ("message", request.message.as_deref()),
    ])?;

    let raw_phone = request.phone.as_deref().unwrap_or_default();
    let phone = normalize_phone(raw_phone)
        .ok_or_else(|| ValidationError::invalid("phone", "Phone must contain digits"))?;

    let forward = ForwardRequest {
        phone: phone.clone(),
        message: request.message.unwrap_or_default().trim().to_string(),
        instancia: request.instancia,
        conversation: request.conversation,
        log_id: request.log_id,
        is_group: request.is_group || is_group_jid(raw_phone),
    };

    let response = match state.coaching.handle_inbound(&forward).await? {
        CoachingOutcome::Skipped { inbound, reason } => {
            info!(phone = %phone, reason, "AI reply skipped");
            ProcessMessageResponse {
                success: true,
                phone,
                ai_skipped: true,
                reason: Some(reason),
                inbound_id: inbound.id,
                reply: None,
                message_id: None,
                delivered: false,
            }
        }
        CoachingOutcome::Replied {
            inbound,
            reply,
            delivered,
        } => {
            info!(phone = %phone, message_id = %reply.id, delivered, "AI reply stored");
            ProcessMessageResponse {
                success: true,
                phone,
                ai_skipped: false,
                reason: None,
                inbound_id: inbound.id,
                reply: Some(reply.content),
                message_id: Some(reply.id),
                delivered,
            }
        }
    };

    Ok(Json(response))
}

/// When a service key is configured the caller must present it as a bearer token
fn verify_service_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    if extract_bearer_token(header)? == expected {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}
