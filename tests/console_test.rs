mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coach_connect::auth::UserRole;
use coach_connect::models::{MessageSender, NewChatMessage};
use coach_connect::store::Repository;
use common::{mock_llm_reply, test_config, TestApp};

const PHONE: &str = "5511933332222";

async fn inbound(app: &TestApp, content: &str) {
    app.repo
        .insert_message(NewChatMessage {
            phone: PHONE.to_string(),
            user_id: None,
            sender: MessageSender::User,
            content: content.to_string(),
            instance: Some("academia-01".to_string()),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_console_requires_coach_or_admin() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);

    let (status, _) = app
        .request(Method::GET, "/api/console/conversations", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let athlete = app.token(Uuid::new_v4(), UserRole::Athlete);
    let (status, body) = app
        .request(Method::GET, "/api/console/conversations", Some(&athlete), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_permissions");

    for role in [UserRole::Coach, UserRole::Admin] {
        let token = app.token(Uuid::new_v4(), role);
        let (status, _) = app
            .request(Method::GET, "/api/console/webhook-logs", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_conversation_list_and_read_tracking() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);
    let coach = app.token(Uuid::new_v4(), UserRole::Coach);

    inbound(&app, "Oi!").await;
    inbound(&app, "Posso trocar o treino de hoje?").await;

    let (status, body) = app
        .request(Method::GET, "/api/console/conversations", Some(&coach), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let conversation = &body["conversations"][0];
    assert_eq!(conversation["phone"], PHONE);
    assert_eq!(conversation["unread_count"], 2);
    assert_eq!(conversation["last_message"], "Posso trocar o treino de hoje?");
    assert_eq!(conversation["ai_paused"], false);

    let uri = format!("/api/console/conversations/{}/messages", PHONE);
    let (status, body) = app.request(Method::GET, &uri, Some(&coach), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Oi!");

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/console/conversations/{}/read", PHONE),
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked_read"], 2);

    let (_, body) = app
        .request(Method::GET, "/api/console/conversations", Some(&coach), None)
        .await;
    assert_eq!(body["conversations"][0]["unread_count"], 0);
}

#[tokio::test]
async fn test_message_page_shows_latest_and_polls_newer() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);
    let coach = app.token(Uuid::new_v4(), UserRole::Coach);

    for i in 0..5 {
        inbound(&app, &format!("m{}", i)).await;
    }

    let uri = format!("/api/console/conversations/{}/messages", PHONE);
    let contents = |body: &serde_json::Value| -> Vec<String> {
        body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = app
        .request(Method::GET, &format!("{}?limit=2", uri), Some(&coach), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents(&body), vec!["m3", "m4"]);

    let (_, body) = app.request(Method::GET, &uri, Some(&coach), None).await;
    assert_eq!(contents(&body), vec!["m0", "m1", "m2", "m3", "m4"]);
    let third_at = body["messages"][2]["created_at"].as_str().unwrap().to_string();
    let last_at = body["messages"][4]["created_at"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, &format!("{}?since={}", uri, third_at), Some(&coach), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents(&body), vec!["m3", "m4"]);

    let (_, body) = app
        .request(Method::GET, &format!("{}?since={}", uri, last_at), Some(&coach), None)
        .await;
    assert!(contents(&body).is_empty());

    inbound(&app, "m5").await;
    let (_, body) = app
        .request(Method::GET, &format!("{}?since={}", uri, last_at), Some(&coach), None)
        .await;
    assert_eq!(contents(&body), vec!["m5"]);
}

#[tokio::test]
async fn test_operator_message_is_stored_and_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message/sendText/academia-01"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.whatsapp_api_url = Some(server.uri());
    config.whatsapp_api_key = Some("evolution-key".to_string());
    config.whatsapp_instance = "academia-01".to_string();
    let app = TestApp::new(config);
    let coach = app.token(Uuid::new_v4(), UserRole::Coach);

    let uri = format!("/api/console/conversations/{}/messages", PHONE);

    let (status, body) = app
        .request(Method::POST, &uri, Some(&coach), Some(json!({ "content": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"], json!(["content"]));

    let (status, body) = app
        .request(
            Method::POST,
            &uri,
            Some(&coach),
            Some(json!({ "content": "Oi, aqui é o coach Rafael." })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["delivered"], true);
    assert_eq!(body["message"]["sender"], "operator");
    assert_eq!(body["message"]["direction"], "outbound");

    let messages = app.repo.recent_messages(PHONE, 10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, MessageSender::Operator);
}

#[tokio::test]
async fn test_takeover_suppresses_ai_replies() {
    let server = MockServer::start().await;
    mock_llm_reply(&server, "Resposta automática").await;

    let app = TestApp::with_mock(&server);
    let coach = app.token(Uuid::new_v4(), UserRole::Coach);
    let ai_uri = format!("/api/console/conversations/{}/ai", PHONE);

    let (status, body) = app
        .request(Method::PUT, &ai_uri, Some(&coach), Some(json!({ "paused": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ai_paused"], true);

    let (_, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "Preciso falar com alguém" })),
        )
        .await;
    assert_eq!(body["ai_skipped"], true);

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/console/conversations/{}/messages", PHONE),
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(body["ai_paused"], true);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);

    app.request(Method::PUT, &ai_uri, Some(&coach), Some(json!({ "paused": false })))
        .await;

    let (_, body) = app
        .request(
            Method::POST,
            "/functions/process-message",
            None,
            Some(json!({ "phone": PHONE, "message": "Voltou?" })),
        )
        .await;
    assert_eq!(body["ai_skipped"], false);
    assert_eq!(body["reply"], "Resposta automática");
}

#[tokio::test]
async fn test_webhook_logs_are_listed_newest_first() {
    let server = MockServer::start().await;
    let app = TestApp::with_mock(&server);
    let admin = app.token(Uuid::new_v4(), UserRole::Admin);

    app.request(Method::POST, "/functions/webhook", None, Some(json!({ "message": "a" })))
        .await;
    app.request(Method::POST, "/functions/webhook", None, Some(json!({ "remoteJid": "1@s.whatsapp.net" })))
        .await;

    let (status, body) = app
        .request(Method::GET, "/api/console/webhook-logs?limit=1", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "rejected");
    assert_eq!(logs[0]["remote_jid"], "1@s.whatsapp.net");
}
