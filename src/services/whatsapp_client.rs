use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Outbound WhatsApp delivery through an Evolution-style gateway
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
    api_key: String,
    default_instance: String,
}

impl std::fmt::Debug for WhatsAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("default_instance", &self.default_instance)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    number: &'a str,
    text: &'a str,
}

impl WhatsAppClient {
    pub fn new(
        base_url: String,
        api_key: String,
        default_instance: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_instance,
        })
    }

    /// Send a text message; `instance` falls back to the configured default
    pub async fn send_text(&self, instance: Option<&str>, phone: &str, text: &str) -> Result<()> {
        let instance = instance
            .filter(|i| !i.is_empty())
            .unwrap_or(&self.default_instance);

        let response = self
            .client
            .post(format!("{}/message/sendText/{}", self.base_url, instance))
            .header("apikey", &self.api_key)
            .json(&SendTextRequest { number: phone, text })
            .send()
            .await
            .context("Failed to send WhatsApp message")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("WhatsApp delivery failed: {} - {}", status, error_text);
            anyhow::bail!("WhatsApp gateway responded with {}", status);
        }

        info!(phone = %phone, instance = %instance, "Delivered WhatsApp message");
        Ok(())
    }
}
