use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MESSAGE_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inbound" => Some(MessageDirection::Inbound),
            "outbound" => Some(MessageDirection::Outbound),
            _ => None,
        }
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    User,
    Ai,
    Operator,
}

impl MessageSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageSender::User => "user",
            MessageSender::Ai => "ai",
            MessageSender::Operator => "operator",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(MessageSender::User),
            "ai" => Some(MessageSender::Ai),
            "operator" => Some(MessageSender::Operator),
            _ => None,
        }
    }

    pub fn direction(&self) -> MessageDirection {
        match self {
            MessageSender::User => MessageDirection::Inbound,
            MessageSender::Ai | MessageSender::Operator => MessageDirection::Outbound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub phone: String,
    pub user_id: Option<Uuid>,
    pub direction: MessageDirection,
    pub sender: MessageSender,
    pub content: String,
    pub instance: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub phone: String,
    pub user_id: Option<Uuid>,
    pub sender: MessageSender,
    pub content: String,
    pub instance: Option<String>,
}

impl NewChatMessage {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            phone: self.phone,
            user_id: self.user_id,
            direction: self.sender.direction(),
            sender: self.sender,
            content: self.content,
            instance: self.instance,
            created_at: Utc::now(),
            read_at: None,
        }
    }
}

/// One row of the operator console conversation list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub phone: String,
    pub contact_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub last_message: String,
    pub last_direction: MessageDirection,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
    pub ai_paused: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MessageQuery {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl MessageQuery {
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_MESSAGE_PAGE).clamp(1, 500)
    }
}
