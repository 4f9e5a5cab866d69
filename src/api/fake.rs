//! In-memory fake of the chat API for unit and integration tests
//!
//! [`FakeChatApi`] keeps users, sessions and messages in memory and answers
//! like the real server does: 404 for unknown ids, sessions newest first,
//! and a canned assistant reply for every chat message. Failures can be
//! switched on per operation to exercise error recovery.
//!
//! # Example
//!
//! ```
//! use supportchat::api::fake::FakeChatApi;
//! use supportchat::api::ChatApi;
//! use supportchat::models::NewUser;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let api = FakeChatApi::new();
//! let user = api
//!     .create_user(&NewUser { name: "Ada Lovelace".into(), email: "ada@example.com".into() })
//!     .await
//!     .unwrap();
//! assert_eq!(user.first_name.as_deref(), Some("Ada"));
//! assert!(api.get_user(user.id + 1).await.is_err());
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::api::ChatApi;
use crate::error::{Result, SupportChatError};
use crate::models::{
    ChatRequest, ChatResponse, Message, MessageId, NewMessage, NewSession, NewUser, Sender,
    Session, User,
};

/// Reply the fake assistant gives to every message
pub const FAKE_REPLY: &str = "Thanks for reaching out! A support agent will look into it.";

#[derive(Debug, Default)]
struct Backend {
    users: Vec<User>,
    sessions: Vec<Session>,
    messages: Vec<Message>,
    last_id: i64,
}

impl Backend {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn store_message(&mut self, session_id: i64, sender: Sender, content: &str) -> Message {
        // Strictly increasing timestamps keep ordering stable within a test.
        let message = Message {
            id: MessageId::Server(self.next_id()),
            session_id,
            sender,
            content: content.to_string(),
            timestamp: Utc::now() + Duration::milliseconds(self.last_id),
        };
        self.messages.push(message.clone());
        message
    }
}

/// In-memory [`ChatApi`]
#[derive(Debug, Default)]
pub struct FakeChatApi {
    backend: Mutex<Backend>,
    fail_send: AtomicBool,
    fail_fetch: AtomicBool,
    fail_list: AtomicBool,
    send_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `send_chat` answer 500 until switched off
    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Make `fetch_messages` answer 500 until switched off
    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make `list_sessions` answer 500 until switched off
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Number of `send_chat` calls so far
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_messages` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Insert a user directly
    pub async fn seed_user(&self, name: &str, email: &str) -> User {
        self.create_user(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
        })
        .await
        .expect("fake create_user never fails")
    }

    /// Insert a session directly
    pub async fn seed_session(&self, user_id: i64, title: &str) -> Session {
        self.create_session(&NewSession {
            user_id,
            title: Some(title.to_string()),
        })
        .await
        .expect("fake create_session never fails")
    }

    /// Insert a message directly
    pub async fn seed_message(&self, session_id: i64, sender: Sender, content: &str) -> Message {
        self.backend
            .lock()
            .await
            .store_message(session_id, sender, content)
    }

    fn server_error(what: &str) -> anyhow::Error {
        SupportChatError::Api {
            status: 500,
            message: format!("{} failed", what),
        }
        .into()
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut backend = self.backend.lock().await;
        let (first, last) = match user.name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (user.name.clone(), String::new()),
        };
        let created = User {
            id: backend.next_id(),
            name: None,
            first_name: Some(first),
            last_name: Some(last),
            email: user.email.clone(),
        };
        backend.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, user_id: i64) -> Result<User> {
        let backend = self.backend.lock().await;
        backend
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| SupportChatError::NotFound("User not found".to_string()).into())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let backend = self.backend.lock().await;
        backend
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| SupportChatError::NotFound("User not found".to_string()).into())
    }

    async fn create_session(&self, session: &NewSession) -> Result<Session> {
        let mut backend = self.backend.lock().await;
        let id = backend.next_id();
        let created = Session {
            id,
            user_id: session.user_id,
            title: Some(
                session
                    .title
                    .clone()
                    .unwrap_or_else(|| "New Chat".to_string()),
            ),
            created_at: Some(Utc::now() + Duration::milliseconds(id)),
            started_at: None,
        };
        backend.sessions.push(created.clone());
        Ok(created)
    }

    async fn list_sessions(&self, user_id: Option<i64>) -> Result<Vec<Session>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::server_error("list sessions"));
        }
        let backend = self.backend.lock().await;
        let mut sessions: Vec<Session> = backend
            .sessions
            .iter()
            .filter(|s| user_id.map_or(true, |id| s.user_id == id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn get_session(&self, session_id: i64) -> Result<Session> {
        let backend = self.backend.lock().await;
        backend
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| SupportChatError::NotFound("Session not found".to_string()).into())
    }

    async fn fetch_messages(&self, session_id: i64) -> Result<Vec<Message>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::server_error("fetch messages"));
        }
        let backend = self.backend.lock().await;
        let mut messages: Vec<Message> = backend
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn post_message(&self, message: &NewMessage) -> Result<Message> {
        let mut backend = self.backend.lock().await;
        Ok(backend.store_message(message.session_id, message.sender, &message.content))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Self::server_error("chat"));
        }

        let mut backend = self.backend.lock().await;
        if !backend.users.iter().any(|u| u.id == request.user_id) {
            return Err(SupportChatError::NotFound("User not found".to_string()).into());
        }

        let session_id = match request.session_id {
            Some(id) if backend.sessions.iter().any(|s| s.id == id) => id,
            Some(_) => {
                return Err(SupportChatError::NotFound("Session not found".to_string()).into())
            }
            None => {
                let id = backend.next_id();
                backend.sessions.push(Session {
                    id,
                    user_id: request.user_id,
                    title: Some("New Support Chat".to_string()),
                    created_at: Some(Utc::now() + Duration::milliseconds(id)),
                    started_at: None,
                });
                id
            }
        };

        backend.store_message(session_id, Sender::User, &request.message);
        backend.store_message(session_id, Sender::Ai, FAKE_REPLY);
        Ok(ChatResponse {
            session_id,
            message: FAKE_REPLY.to_string(),
        })
    }
}
