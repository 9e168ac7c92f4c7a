// Integration clients and business logic shared by the handlers

pub mod phone;
pub mod ai_forwarder;
pub mod llm_client;
pub mod whatsapp_client;
pub mod coaching_service;
pub mod dashboard_service;

pub use ai_forwarder::{AiForwarder, ForwardRequest};
pub use llm_client::{LlmClient, LlmMessage};
pub use whatsapp_client::WhatsAppClient;
pub use coaching_service::{CoachingError, CoachingOutcome, CoachingService};
pub use dashboard_service::{Dashboard, DashboardService};
