use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Payload handed from the webhook receiver to the AI-processing function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub phone: String,
    pub message: String,
    pub instancia: Option<String>,
    pub conversation: Option<String>,
    pub log_id: Option<Uuid>,
    #[serde(default)]
    pub is_group: bool,
}

/// Relays accepted webhook payloads to the AI-processing function
#[derive(Debug, Clone)]
pub struct AiForwarder {
    client: Client,
    url: String,
    service_key: Option<String>,
}

impl AiForwarder {
    pub fn new(url: String, service_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            service_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the payload; any non-2xx answer is an error carrying the status
    pub async fn forward(&self, request: &ForwardRequest) -> Result<()> {
        let mut builder = self.client.post(&self.url).json(request);

        if let Some(key) = &self.service_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach AI processor at {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("AI processor rejected message: {} - {}", status, error_text);
            anyhow::bail!("AI processor responded with {}", status);
        }

        info!(phone = %request.phone, "Forwarded message to AI processor");
        Ok(())
    }
}
