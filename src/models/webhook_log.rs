use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_LOG_LIMIT: i64 = 50;

/// Lifecycle of a webhook audit row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Received,
    Forwarded,
    Failed,
    Rejected,
}

impl WebhookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookStatus::Received => "received",
            WebhookStatus::Forwarded => "forwarded",
            WebhookStatus::Failed => "failed",
            WebhookStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "received" => Some(WebhookStatus::Received),
            "forwarded" => Some(WebhookStatus::Forwarded),
            "failed" => Some(WebhookStatus::Failed),
            "rejected" => Some(WebhookStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: Uuid,
    pub remote_jid: Option<String>,
    pub phone: Option<String>,
    pub instance: Option<String>,
    pub payload: Value,
    pub status: WebhookStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWebhookLog {
    pub remote_jid: Option<String>,
    pub phone: Option<String>,
    pub instance: Option<String>,
    pub payload: Value,
    pub status: WebhookStatus,
    pub error_message: Option<String>,
}

impl NewWebhookLog {
    pub fn into_log(self) -> WebhookLog {
        let now = Utc::now();
        WebhookLog {
            id: Uuid::new_v4(),
            remote_jid: self.remote_jid,
            phone: self.phone,
            instance: self.instance,
            payload: self.payload,
            status: self.status,
            error_message: self.error_message,
            created_at: now,
            updated_at: now,
        }
    }
}
