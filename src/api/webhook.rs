use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::auth::AuthError;
use crate::models::{require_fields, NewWebhookLog, ValidationError, WebhookStatus};
use crate::services::phone::{is_group_jid, normalize_phone};
use crate::services::ForwardRequest;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Fields read from the automation payload. Everything else in the body is
/// kept verbatim in the audit row.
#[derive(Debug, Clone, Default)]
pub struct WebhookPayload {
    pub message: Option<String>,
    pub remote_jid: Option<String>,
    pub instancia: Option<String>,
    pub conversation: Option<String>,
}

impl WebhookPayload {
    pub fn from_json(raw: &Value) -> Result<Self, ApiError> {
        if !raw.is_object() {
            return Err(ApiError::BadRequest(
                "Webhook payload must be a JSON object".to_string(),
            ));
        }

        Ok(Self {
            message: text_field(raw, "message"),
            remote_jid: text_field(raw, "remoteJid"),
            instancia: text_field(raw, "instancia"),
            conversation: text_field(raw, "conversation"),
        })
    }
}

/// Strings are trimmed and dropped when blank; numbers are accepted as text
fn text_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub phone: String,
    #[serde(rename = "remoteJid")]
    pub remote_jid: String,
    pub instancia: Option<String>,
    pub conversation: Option<String>,
    pub log_id: Uuid,
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}

/// Receive an inbound WhatsApp message relayed by the automation and hand it
/// to the AI-processing function.
#[instrument(skip_all)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    verify_secret(state.config.webhook_secret.as_deref(), &headers)?;

    let Json(raw) = body?;
    let payload = WebhookPayload::from_json(&raw)?;

    if let Err(e) = require_fields(&[
        ("message", payload.message.as_deref()),
        ("remoteJid", payload.remote_jid.as_deref()),
    ]) {
        warn!("Rejecting webhook: {}", e);
        record_rejection(&state, &payload, raw, &e).await;
        return Err(e.into());
    }

    // require_fields guarantees both are present
    let (Some(message), Some(remote_jid)) = (payload.message.clone(), payload.remote_jid.clone())
    else {
        return Err(ApiError::BadRequest("Missing message or remoteJid".to_string()));
    };

    let Some(phone) = normalize_phone(&remote_jid) else {
        let e = ValidationError::invalid("remoteJid", "Could not derive a phone number");
        warn!(remote_jid = %remote_jid, "Rejecting webhook: {}", e);
        record_rejection(&state, &payload, raw, &e).await;
        return Err(e.into());
    };

    let log = state
        .repo
        .insert_webhook_log(NewWebhookLog {
            remote_jid: Some(remote_jid.clone()),
            phone: Some(phone.clone()),
            instance: payload.instancia.clone(),
            payload: raw,
            status: WebhookStatus::Received,
            error_message: None,
        })
        .await?;

    let forward = ForwardRequest {
        phone: phone.clone(),
        message,
        instancia: payload.instancia.clone(),
        conversation: payload.conversation.clone(),
        log_id: Some(log.id),
        is_group: is_group_jid(&remote_jid),
    };

    if let Err(e) = state.forwarder.forward(&forward).await {
        let message = format!("{:#}", e);
        warn!(log_id = %log.id, phone = %phone, "Forwarding to AI processor failed: {}", message);
        state
            .repo
            .update_webhook_status(log.id, WebhookStatus::Failed, Some(message.clone()))
            .await?;
        return Err(ApiError::Upstream {
            code: "forward_failed",
            message,
        });
    }

    state
        .repo
        .update_webhook_status(log.id, WebhookStatus::Forwarded, None)
        .await?;

    info!(log_id = %log.id, phone = %phone, "Webhook forwarded");

    Ok(Json(WebhookResponse {
        success: true,
        phone,
        remote_jid,
        instancia: payload.instancia,
        conversation: payload.conversation,
        log_id: log.id,
    }))
}

fn verify_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(AuthError::InvalidWebhookSecret)
    }
}

/// The audit row is best effort; the caller still gets its 400
async fn record_rejection(
    state: &AppState,
    payload: &WebhookPayload,
    raw: Value,
    reason: &ValidationError,
) {
    let log = NewWebhookLog {
        remote_jid: payload.remote_jid.clone(),
        phone: payload.remote_jid.as_deref().and_then(normalize_phone),
        instance: payload.instancia.clone(),
        payload: raw,
        status: WebhookStatus::Rejected,
        error_message: Some(reason.to_string()),
    };

    if let Err(e) = state.repo.insert_webhook_log(log).await {
        warn!("Failed to record rejected webhook: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_payload_fields_are_trimmed() {
        let payload = WebhookPayload::from_json(&json!({
            "message": "  oi coach ",
            "remoteJid": "5511999998888@s.whatsapp.net",
            "instancia": "",
            "conversation": 42
        }))
        .unwrap();

        assert_eq!(payload.message.as_deref(), Some("oi coach"));
        assert_eq!(payload.instancia, None);
        assert_eq!(payload.conversation.as_deref(), Some("42"));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert!(WebhookPayload::from_json(&json!(["message"])).is_err());
    }

    #[test]
    fn test_verify_secret() {
        let mut headers = HeaderMap::new();
        assert!(verify_secret(None, &headers).is_ok());
        assert!(verify_secret(Some("s3cret"), &headers).is_err());

        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(verify_secret(Some("s3cret"), &headers).is_ok());
        assert!(verify_secret(Some("other"), &headers).is_err());
    }
}
