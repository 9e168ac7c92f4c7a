use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiError, AppState};
use crate::auth::{coach_or_admin_middleware, jwt_auth_middleware, JwtService, UserSession};
use crate::models::{
    validate_message_content, ChatMessage, ConversationSummary, MessageQuery, MessageSender,
    NewChatMessage, ValidationError, WebhookLog, DEFAULT_LOG_LIMIT,
};
use crate::services::phone::normalize_phone;

const MAX_LOG_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub instance: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetAiRequest {
    pub paused: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub phone: String,
    pub messages: Vec<ChatMessage>,
    pub ai_paused: bool,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: ChatMessage,
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub phone: String,
    pub marked_read: u64,
}

#[derive(Debug, Serialize)]
pub struct AiStatusResponse {
    pub success: bool,
    pub phone: String,
    pub ai_paused: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookLogsResponse {
    pub success: bool,
    pub logs: Vec<WebhookLog>,
}

/// Operator console, restricted to coaches and admins
pub fn console_routes(jwt: JwtService) -> Router<AppState> {
    Router::new()
        .route("/console/conversations", get(list_conversations))
        .route(
            "/console/conversations/:phone/messages",
            get(list_messages).post(send_message),
        )
        .route("/console/conversations/:phone/read", post(mark_read))
        .route("/console/conversations/:phone/ai", put(set_ai_paused))
        .route("/console/webhook-logs", get(list_webhook_logs))
        .route_layer(middleware::from_fn(coach_or_admin_middleware))
        .route_layer(middleware::from_fn_with_state(jwt, jwt_auth_middleware))
}

fn path_phone(raw: &str) -> Result<String, ApiError> {
    normalize_phone(raw)
        .ok_or_else(|| ValidationError::invalid("phone", "Phone must contain digits").into())
}

#[instrument(skip_all, fields(operator = %session.user_id))]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let conversations = state.repo.list_conversations().await?;

    Ok(Json(ConversationsResponse {
        success: true,
        total: conversations.len(),
        conversations,
    }))
}

/// Messages oldest first; `since` lets the console poll for new ones
#[instrument(skip_all, fields(phone = %phone))]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(phone): Path<String>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let Query(query) = query?;
    let phone = path_phone(&phone)?;

    let messages = state
        .repo
        .list_messages(&phone, query.since, query.page_size())
        .await?;
    let ai_paused = state.repo.is_ai_paused(&phone).await?;

    Ok(Json(MessagesResponse {
        success: true,
        phone,
        messages,
        ai_paused,
    }))
}

/// Store an operator reply and push it to WhatsApp when a sender is configured
#[instrument(skip_all, fields(operator = %session.user_id, phone = %phone))]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(phone): Path<String>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let Json(request) = body?;
    let phone = path_phone(&phone)?;

    let content = request.content.unwrap_or_default();
    validate_message_content(&content)?;
    let content = content.trim().to_string();

    let user_id = state
        .repo
        .find_profile_by_phone(&phone)
        .await?
        .map(|p| p.user_id);

    let message = state
        .repo
        .insert_message(NewChatMessage {
            phone: phone.clone(),
            user_id,
            sender: MessageSender::Operator,
            content,
            instance: request.instance,
        })
        .await?;

    let delivered = state
        .coaching
        .deliver(message.instance.as_deref(), &phone, &message.content)
        .await;

    info!(message_id = %message.id, delivered, "Operator message stored");

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message,
            delivered,
        }),
    ))
}

#[instrument(skip_all, fields(phone = %phone))]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let phone = path_phone(&phone)?;
    let marked_read = state.repo.mark_read(&phone).await?;

    Ok(Json(MarkReadResponse {
        success: true,
        phone,
        marked_read,
    }))
}

/// Operator takeover: while paused, inbound messages get no AI reply
#[instrument(skip_all, fields(operator = %session.user_id, phone = %phone))]
pub async fn set_ai_paused(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(phone): Path<String>,
    body: Result<Json<SetAiRequest>, JsonRejection>,
) -> Result<Json<AiStatusResponse>, ApiError> {
    let Json(request) = body?;
    let phone = path_phone(&phone)?;

    state.repo.set_ai_paused(&phone, request.paused).await?;
    info!(paused = request.paused, "AI takeover toggled");

    Ok(Json(AiStatusResponse {
        success: true,
        phone,
        ai_paused: request.paused,
    }))
}

#[instrument(skip_all)]
pub async fn list_webhook_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<WebhookLogsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);

    let logs = state.repo.list_webhook_logs(limit).await?;

    Ok(Json(WebhookLogsResponse {
        success: true,
        logs,
    }))
}
