use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Which repository implementation the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(StorageBackend::Postgres),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

const MAX_CHAT_HISTORY: i64 = 100;

/// Prompt history window, kept within `1..=100`
pub fn clamp_history_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_CHAT_HISTORY)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub seed_demo_data: bool,
    pub webhook_secret: Option<String>,
    pub ai_processor_url: Option<String>,
    pub service_key: Option<String>,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_api_key: Option<String>,
    pub whatsapp_instance: String,
    pub chat_history_limit: i64,
    pub http_timeout: Duration,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string());

        let storage = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        let storage_backend = StorageBackend::from_str(&storage)
            .with_context(|| format!("Unknown STORAGE_BACKEND {:?}", storage))?;

        let seed_demo_data = env::var("SEED_DEMO_DATA")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let chat_history_limit = env::var("CHAT_HISTORY_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<i64>()
            .map(clamp_history_limit)
            .unwrap_or(20);

        let http_timeout_secs = env::var("HTTP_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            storage_backend,
            seed_demo_data,
            webhook_secret: optional_var("WEBHOOK_SECRET"),
            ai_processor_url: optional_var("AI_PROCESSOR_URL"),
            service_key: optional_var("SERVICE_KEY"),
            llm_api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_api_key: optional_var("LLM_API_KEY"),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            whatsapp_api_url: optional_var("WHATSAPP_API_URL"),
            whatsapp_api_key: optional_var("WHATSAPP_API_KEY"),
            whatsapp_instance: env::var("WHATSAPP_INSTANCE")
                .unwrap_or_else(|_| "default".to_string()),
            chat_history_limit,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the webhook receiver forwards messages; defaults to this server's
    /// own AI-processing function.
    pub fn ai_processor_endpoint(&self) -> String {
        self.ai_processor_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" { "127.0.0.1" } else { self.host.as_str() };
            format!("http://{}:{}/functions/process-message", host, self.port)
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            storage_backend: StorageBackend::Memory,
            seed_demo_data: false,
            webhook_secret: None,
            ai_processor_url: None,
            service_key: None,
            llm_api_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            whatsapp_api_url: None,
            whatsapp_api_key: None,
            whatsapp_instance: "default".to_string(),
            chat_history_limit: 20,
            http_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!(StorageBackend::from_str("Postgres"), Some(StorageBackend::Postgres));
        assert_eq!(StorageBackend::from_str("memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::from_str("redis"), None);
    }

    #[test]
    fn test_ai_processor_endpoint_defaults_to_self() {
        let config = AppConfig {
            port: 8080,
            ..AppConfig::default()
        };
        assert_eq!(
            config.ai_processor_endpoint(),
            "http://127.0.0.1:8080/functions/process-message"
        );

        let config = AppConfig {
            ai_processor_url: Some("https://functions.example.com/process-ai".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.ai_processor_endpoint(), "https://functions.example.com/process-ai");
        assert_eq!(config.server_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_history_limit_is_clamped() {
        assert_eq!(clamp_history_limit(-5), 1);
        assert_eq!(clamp_history_limit(0), 1);
        assert_eq!(clamp_history_limit(30), 30);
        assert_eq!(clamp_history_limit(10_000), 100);
    }
}
