#![allow(deprecated)]

/// End-to-end tests of the `supportchat` binary
///
/// Each test points the binary at a throwaway store and, where the API is
/// needed, at a wiremock server.
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

/// Command with isolated config and store
fn supportchat(tmp: &TempDir, api_base: &str) -> Command {
    let mut cmd = Command::cargo_bin("supportchat").unwrap();
    cmd.env_remove("SUPPORTCHAT_API_BASE")
        .env_remove("SUPPORTCHAT_STORE_DB")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(tmp.path().join("missing.yaml"))
        .arg("--api-base")
        .arg(api_base)
        .arg("--store-path")
        .arg(tmp.path().join("store.db"));
    cmd
}

fn user_body() -> serde_json::Value {
    json!({
        "id": 7,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com"
    })
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("supportchat").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_whoami_without_login() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = supportchat(&tmp, "http://127.0.0.1:9");
    cmd.arg("whoami");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[test]
fn test_send_requires_login() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = supportchat(&tmp, "http://127.0.0.1:9");
    cmd.arg("send").arg("hello");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_config_dir, config_path) =
        common::temp_config_file("chat:\n  max_message_length: 0\n");
    let tmp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("supportchat").unwrap();
    cmd.env_remove("SUPPORTCHAT_MAX_MESSAGE_LENGTH")
        .arg("--config")
        .arg(config_path)
        .arg("--store-path")
        .arg(tmp.path().join("store.db"))
        .arg("whoami");
    cmd.assert().failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_whoami_then_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/by-email/ada@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();

    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("ada@example.com")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada"));

    supportchat(&tmp, &server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("ada@example.com"));

    supportchat(&tmp, &server.uri())
        .arg("logout")
        .assert()
        .success();

    supportchat(&tmp, &server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_unknown_email_suggests_register() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/by-email/new@example.com"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "User not found"
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("new@example.com")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--register"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_prints_reply() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .and(query_param("user_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "user_id": 7, "title": "Billing", "created_at": "2024-05-01T10:00:00"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": 11,
            "message": "Your refund is on its way."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": 11, "sender": "user", "content": "Refund?", "timestamp": "2024-05-01T10:00:01"},
            {"id": 2, "session_id": 11, "sender": "ai", "content": "Your refund is on its way.", "timestamp": "2024-05-01T10:00:02"}
        ])))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("7")
        .assert()
        .success();

    supportchat(&tmp, &server.uri())
        .arg("send")
        .arg("Refund?")
        .assert()
        .success()
        .stdout(predicate::str::contains("Support: Your refund is on its way."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_rejects_overlong_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "user_id": 7, "title": "Billing"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("7")
        .assert()
        .success();

    supportchat(&tmp, &server.uri())
        .arg("send")
        .arg("x".repeat(501))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message is too long (501/500 characters)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_messages_prints_deduplicated_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11, "user_id": 7, "title": "Billing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session_id": 11, "sender": "user", "content": "Charged twice", "timestamp": "2024-05-01T10:00:01"},
            {"id": 1, "session_id": 11, "sender": "user", "content": "Charged twice", "timestamp": "2024-05-01T10:00:01"},
            {"id": 2, "session_id": 11, "sender": "ai", "content": "Refund queued", "timestamp": "2024-05-01T10:00:02"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12, "user_id": 8, "title": "Not yours"
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("7")
        .assert()
        .success();

    let output = supportchat(&tmp, &server.uri())
        .arg("messages")
        .arg("11")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("You: Charged twice").count(), 1);
    assert!(stdout.contains("Support: Refund queued"));

    supportchat(&tmp, &server.uri())
        .arg("messages")
        .arg("12")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_messages_requires_login() {
    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, "http://127.0.0.1:9")
        .arg("messages")
        .arg("11")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_chat_requires_login() {
    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, "http://127.0.0.1:9")
        .arg("chat")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

/// Mocks for opening a fresh session 11 for `user_id`
async fn mount_new_session(server: &MockServer, user_id: i64) {
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "user_id": user_id,
            "title": "New Support Chat",
            "created_at": "2024-05-01T10:00:00"
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/11/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_as_guest_runs_special_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/users/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 21,
            "first_name": "Guest",
            "last_name": "",
            "email": "guest_1700000000000@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_new_session(&server, 21).await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("chat")
        .arg("--guest")
        .write_stdin("/whoami\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: Guest"))
        .stdout(predicate::str::contains("Session: 11 (New Support Chat)"))
        .stdout(predicate::str::contains("Goodbye!"));

    // The guest is cached for later commands.
    supportchat(&tmp, &server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("guest_1700000000000@example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_new_session_reports_failed_send() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/users/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .mount(&server)
        .await;
    mount_new_session(&server, 7).await;
    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "model offline"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    supportchat(&tmp, &server.uri())
        .arg("login")
        .arg("7")
        .assert()
        .success();

    supportchat(&tmp, &server.uri())
        .arg("chat")
        .arg("--new")
        .write_stdin("Where is my order?\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Support: Sorry, I couldn't send your message. Please try again.",
        ))
        .stdout(predicate::str::contains("Goodbye!"))
        .stderr(predicate::str::contains("API error (500): model offline"));
}
