use anyhow::Result;
use std::sync::Arc;

use crate::auth::JwtService;
use crate::config::AppConfig;
use crate::services::{AiForwarder, CoachingService, DashboardService, LlmClient, WhatsAppClient};
use crate::store::Repository;

/// Everything the handlers share; cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<dyn Repository>,
    pub jwt: JwtService,
    pub forwarder: AiForwarder,
    pub coaching: CoachingService,
}

impl AppState {
    /// Wire the outbound clients from configuration
    pub fn new(config: AppConfig, repo: Arc<dyn Repository>) -> Result<Self> {
        let forwarder = AiForwarder::new(
            config.ai_processor_endpoint(),
            config.service_key.clone(),
            config.http_timeout,
        )?;

        let llm = LlmClient::new(
            config.llm_api_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
            config.http_timeout,
        )?;

        let whatsapp = match (&config.whatsapp_api_url, &config.whatsapp_api_key) {
            (Some(url), Some(key)) => Some(WhatsAppClient::new(
                url.clone(),
                key.clone(),
                config.whatsapp_instance.clone(),
                config.http_timeout,
            )?),
            _ => None,
        };

        let coaching = CoachingService::new(
            repo.clone(),
            llm,
            whatsapp,
            config.chat_history_limit,
        );

        Ok(Self {
            jwt: JwtService::new(&config.jwt_secret),
            config: Arc::new(config),
            repo,
            forwarder,
            coaching,
        })
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.repo.clone())
    }
}
