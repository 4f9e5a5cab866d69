use serde_json::json;

use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use supportchat::api::{ChatApi, HttpChatApi};
use supportchat::config::ApiConfig;
use supportchat::models::{ChatRequest, MessageId, NewMessage, NewSession, NewUser, Sender};
use supportchat::SupportChatError;

fn client_for(server: &MockServer) -> HttpChatApi {
    let cfg = ApiConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
    };
    HttpChatApi::new(&cfg).unwrap()
}

#[tokio::test]
async fn test_get_user_by_email_decodes_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/users/by-email/ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let user = api.get_user_by_email("ada@example.com").await.unwrap();
    assert_eq!(user.id, 7);
    assert_eq!(user.display_name(), "Ada");
}

#[tokio::test]
async fn test_missing_user_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/users/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "User not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let err = api.get_user(42).await.unwrap_err();
    assert!(SupportChatError::is_not_found(&err));
    assert!(err.to_string().contains("User not found"));
}

#[tokio::test]
async fn test_server_error_carries_status_and_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Error processing chat: model offline"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let err = api
        .send_chat(&ChatRequest {
            user_id: 1,
            session_id: Some(2),
            message: "hello".to_string(),
        })
        .await
        .unwrap_err();

    match err.downcast_ref::<SupportChatError>() {
        Some(SupportChatError::Api { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "Error processing chat: model offline");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_user_and_session_post_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/users/"))
        .and(body_json(json!({"name": "grace", "email": "grace@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3,
            "first_name": "grace",
            "last_name": "",
            "email": "grace@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat/sessions/"))
        .and(body_json(json!({"user_id": 3, "title": "Billing"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "user_id": 3,
            "title": "Billing",
            "created_at": "2024-05-01T10:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let user = api
        .create_user(&NewUser {
            name: "grace".to_string(),
            email: "grace@example.com".to_string(),
        })
        .await
        .unwrap();
    let session = api
        .create_session(&NewSession {
            user_id: user.id,
            title: Some("Billing".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(session.id, 11);
    assert_eq!(
        session.opened_at().unwrap().to_rfc3339(),
        "2024-05-01T10:00:00+00:00"
    );
}

#[tokio::test]
async fn test_list_sessions_sends_user_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .and(query_param("user_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 12, "user_id": 3, "title": null, "started_at": "2024-05-02T09:30:00Z"},
            {"id": 11, "user_id": 3, "title": "Billing", "created_at": "2024-05-01T10:00:00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let sessions = api.list_sessions(Some(3)).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].display_title(), "Untitled Chat");
    assert!(sessions[0].opened_at().is_some());
    assert_eq!(sessions[1].display_title(), "Billing");
}

#[tokio::test]
async fn test_get_session_and_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "user_id": 3,
            "title": "Billing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": 11, "sender": "user", "content": "I was charged twice", "timestamp": "2024-05-01T10:00:01.123456"},
            {"id": 2, "session_id": 11, "sender": "ai", "content": "Sorry to hear that", "timestamp": "2024-05-01T10:00:03"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let session = api.get_session(11).await.unwrap();
    assert_eq!(session.user_id, 3);

    let messages = api.fetch_messages(11).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, MessageId::Server(1));
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[1].sender, Sender::Ai);
    assert!(messages[0].timestamp < messages[1].timestamp);
}

#[tokio::test]
async fn test_post_message_and_send_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/messages/"))
        .and(body_json(json!({
            "session_id": 11,
            "sender": "user",
            "content": "note for the record"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "session_id": 11,
            "sender": "user",
            "content": "note for the record",
            "timestamp": "2024-05-01T11:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .and(body_json(json!({
            "user_id": 3,
            "session_id": 11,
            "message": "Any update?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": 11,
            "message": "Your refund was issued yesterday."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let stored = api
        .post_message(&NewMessage {
            session_id: 11,
            sender: Sender::User,
            content: "note for the record".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(stored.id, MessageId::Server(5));

    let reply = api
        .send_chat(&ChatRequest {
            user_id: 3,
            session_id: Some(11),
            message: "Any update?".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(reply.session_id, 11);
    assert_eq!(reply.message, "Your refund was issued yesterday.");
}

#[tokio::test]
async fn test_base_url_with_path_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/support/api/chat/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "Support Tester",
            "email": "tester@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpChatApi::new(&ApiConfig {
        base_url: format!("{}/support", server.uri()),
        timeout_seconds: 5,
    })
    .unwrap();
    let user = api.get_user(1).await.unwrap();
    assert_eq!(user.display_name(), "Support Tester");
}
