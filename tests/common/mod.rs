#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Once};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coach_connect::api::{create_routes, AppState};
use coach_connect::auth::{JwtService, UserRole};
use coach_connect::config::AppConfig;
use coach_connect::store::{MemoryRepository, Repository};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only";

static INIT: Once = Once::new();

/// Initialize test logging
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Router over an in-memory store, with every outbound service pointed at
/// the given mock server
pub struct TestApp {
    pub router: Router,
    pub repo: MemoryRepository,
    pub jwt: JwtService,
}

pub fn test_config(mock_uri: &str) -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ai_processor_url: Some(format!("{}/functions/process-message", mock_uri)),
        llm_api_url: format!("{}/v1", mock_uri),
        llm_api_key: Some("test-llm-key".to_string()),
        http_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    }
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        init_test_logging();

        let repo = MemoryRepository::new();
        let shared: Arc<dyn Repository> = Arc::new(repo.clone());
        let state = AppState::new(config, shared).expect("Failed to build app state");

        Self {
            router: create_routes(state),
            repo,
            jwt: JwtService::new(TEST_JWT_SECRET),
        }
    }

    pub fn with_mock(server: &MockServer) -> Self {
        Self::new(test_config(&server.uri()))
    }

    pub fn token(&self, user_id: Uuid, role: UserRole) -> String {
        self.jwt
            .create_access_token(user_id, "athlete@example.com", role)
            .expect("Failed to create token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }
}

/// OpenAI-compatible completion answering with `reply`
pub async fn mock_llm_reply(server: &MockServer, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": reply },
                "finish_reason": "stop"
            }]
        })))
        .mount(server)
        .await;
}

pub async fn mock_ai_processor(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/functions/process-message"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "success": status < 400 })))
        .mount(server)
        .await;
}
