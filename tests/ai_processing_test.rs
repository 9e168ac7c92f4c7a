mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coach_connect::models::{MessageSender, UserProfile};
use coach_connect::store::Repository;
use common::{mock_llm_reply, test_config, TestApp};

const PHONE: &str = "5511955554444";

fn profile(user_id: Uuid) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        user_id,
        full_name: "Marina Souza".to_string(),
        email: Some("marina@example.com".to_string()),
        phone: Some(PHONE.to_string()),
        birth_date: None,
        gender: None,
        height_cm: Some(165.0),
        weight_kg: Some(60.0),
        fitness_level: Some("beginner".to_string()),
        primary_goal: "Lose 5 kg".to_string(),
        training_days_per_week: Some(3),
        available_equipment: vec![],
        injuries: Some("left knee".to_string()),
        dietary_restrictions: vec!["lactose".to_string()],
        onboarding_completed: true,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_reply_is_generated_and_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-llm-key"))
        .and(body_string_contains("Marina Souza"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hoje: 30 min de caminhada leve." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    let user_id = Uuid::new_v4();
    app.repo.upsert_profile(profile(user_id)).await.unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "O que treino hoje?", "instancia": "academia-01" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["ai_skipped"], false);
    assert_eq!(body["reply"], "Hoje: 30 min de caminhada leve.");
    assert_eq!(body["delivered"], false);

    let messages = app.repo.recent_messages(PHONE, 10).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, MessageSender::User);
    assert_eq!(messages[0].user_id, Some(user_id));
    assert_eq!(messages[1].sender, MessageSender::Ai);
    assert_eq!(body["message_id"], messages[1].id.to_string());
}

#[tokio::test]
async fn test_paused_conversation_skips_ai() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    app.repo.set_ai_paused(PHONE, true).await.unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "Alguém aí?" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_skipped"], true);
    assert_eq!(body["reason"], "ai_paused");

    let messages = app.repo.recent_messages(PHONE, 10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Alguém aí?");
}

#[tokio::test]
async fn test_group_messages_are_stored_without_reply() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": "120363041234567890", "message": "bom dia", "is_group": true })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_skipped"], true);
    assert_eq!(body["reason"], "group_message");
}

#[tokio::test]
async fn test_missing_fields() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "message": "oi" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"], json!(["phone"]));
}

#[tokio::test]
async fn test_llm_failure_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = TestApp::with_mock(&server);
    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "oi" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "llm_failed");

    // The inbound message is kept even though no reply was produced
    let messages = app.repo.recent_messages(PHONE, 10).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn test_reply_is_delivered_through_whatsapp() {
    let server = MockServer::start().await;
    mock_llm_reply(&server, "Beba água!").await;
    Mock::given(method("POST"))
        .and(path("/message/sendText/academia-01"))
        .and(header("apikey", "evolution-key"))
        .and(body_partial_json(json!({ "number": PHONE, "text": "Beba água!" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "key": { "id": "ABC" } })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.whatsapp_api_url = Some(server.uri());
    config.whatsapp_api_key = Some("evolution-key".to_string());
    let app = TestApp::new(config);

    let (status, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "Dica do dia?", "instancia": "academia-01" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], true);
}

#[tokio::test]
async fn test_service_key_required_when_configured() {
    let server = MockServer::start().await;
    mock_llm_reply(&server, "ok").await;

    let mut config = test_config(&server.uri());
    config.service_key = Some("service-role-key".to_string());
    let app = TestApp::new(config);

    let payload = json!({ "phone": PHONE, "message": "oi" });

    let (status, _) = app
        .request(Method::POST, "/functions/process-message", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/functions/process-message",
            Some("service-role-key"),
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
