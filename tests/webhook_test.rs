mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coach_connect::models::WebhookStatus;
use coach_connect::store::Repository;
use common::{mock_ai_processor, test_config, TestApp};

#[tokio::test]
async fn test_valid_payload_is_forwarded_and_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/process-message"))
        .and(body_partial_json(json!({
            "phone": "5511988887777",
            "message": "Bom dia coach",
            "instancia": "academia-01",
            "conversation": "conv-123",
            "is_group": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    let (status, body) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({
                "message": "Bom dia coach",
                "remoteJid": "5511988887777@s.whatsapp.net",
                "instancia": "academia-01",
                "conversation": "conv-123"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["phone"], "5511988887777");
    assert_eq!(body["remoteJid"], "5511988887777@s.whatsapp.net");
    assert_eq!(body["instancia"], "academia-01");
    assert_eq!(body["conversation"], "conv-123");

    let logs = app.repo.list_webhook_logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, WebhookStatus::Forwarded);
    assert_eq!(logs[0].phone.as_deref(), Some("5511988887777"));
    assert_eq!(body["log_id"], logs[0].id.to_string());
    assert_eq!(logs[0].payload["conversation"], "conv-123");
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/process-message"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    let (status, body) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({ "instancia": "academia-01", "message": "   " })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "missing_fields");
    assert_eq!(body["missing"], json!(["message", "remoteJid"]));

    let logs = app.repo.list_webhook_logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, WebhookStatus::Rejected);
    assert!(logs[0].error_message.is_some());
}

#[tokio::test]
async fn test_missing_remote_jid_only() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({ "message": "oi" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"], json!(["remoteJid"]));
}

#[tokio::test]
async fn test_jid_without_digits_is_rejected() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({ "message": "oi", "remoteJid": "status@broadcast" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_field");
    assert_eq!(body["field"], "remoteJid");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/functions/webhook")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_forward_failure_marks_log_failed() {
    let server = MockServer::start().await;
    mock_ai_processor(&server, 500).await;

    let app = TestApp::with_mock(&server);
    let (status, body) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({ "message": "oi", "remoteJid": "5511977776666@s.whatsapp.net" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "forward_failed");

    let logs = app.repo.list_webhook_logs(10).await.unwrap();
    assert_eq!(logs[0].status, WebhookStatus::Failed);
    assert!(logs[0].error_message.as_deref().unwrap_or_default().contains("500"));
}

#[tokio::test]
async fn test_webhook_secret_is_enforced() {
    let server = MockServer::start().await;
    mock_ai_processor(&server, 200).await;

    let mut config = test_config(&server.uri());
    config.webhook_secret = Some("n8n-shared-secret".to_string());
    let app = TestApp::new(config);

    let payload = json!({ "message": "oi", "remoteJid": "5511977776666@s.whatsapp.net" });

    let (status, _) = app
        .request(Method::POST, "/functions/webhook", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/functions/webhook")
        .header("content-type", "application/json")
        .header("x-webhook-secret", "n8n-shared-secret")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "5511977776666");
}

#[tokio::test]
async fn test_group_messages_are_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/process-message"))
        .and(body_partial_json(json!({ "is_group": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    let (status, _) = app
        .request(
            Method::POST,
            "/functions/webhook",
            None,
            Some(json!({ "message": "treino hoje?", "remoteJid": "120363041234567890@g.us" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
}
