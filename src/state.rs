//! Shared chat state
//!
//! [`ChatState`] holds everything the chat screens render: the logged-in
//! user, their sessions, the active session and its transcript. Each
//! operation makes its API call and then updates the state, including
//! optimistic message sends that are rolled back when the request fails.

use crate::api::ChatApi;
use crate::config::ChatConfig;
use crate::error::{Result, SupportChatError};
use crate::models::{
    ChatRequest, ChatResponse, Message, MessageId, NewSession, Sender, Session, User,
};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Assistant message shown in place of a reply when a send fails
pub const SEND_FAILED_REPLY: &str = "Sorry, I couldn't send your message. Please try again.";

/// Client-side state of the support chat
pub struct ChatState {
    api: Arc<dyn ChatApi>,
    settings: ChatConfig,
    user: Option<User>,
    active_session: Option<Session>,
    sessions: Vec<Session>,
    messages: Vec<Message>,
    loading: Arc<AtomicBool>,
    pending_send: Option<MessageId>,
    last_error: Option<String>,
}

/// Holds the `loading` flag for one send and clears it when dropped,
/// including when the send future is cancelled mid-request
struct LoadingGuard(Arc<AtomicBool>);

impl LoadingGuard {
    fn start(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatState {
    /// Create an empty state over an API client
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use supportchat::api::fake::FakeChatApi;
    /// use supportchat::config::ChatConfig;
    /// use supportchat::state::ChatState;
    ///
    /// let state = ChatState::new(Arc::new(FakeChatApi::new()), ChatConfig::default());
    /// assert!(state.user().is_none());
    /// assert!(state.messages().is_empty());
    /// ```
    pub fn new(api: Arc<dyn ChatApi>, settings: ChatConfig) -> Self {
        Self {
            api,
            settings,
            user: None,
            active_session: None,
            sessions: Vec::new(),
            messages: Vec::new(),
            loading: Arc::new(AtomicBool::new(false)),
            pending_send: None,
            last_error: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session.as_ref()
    }

    /// Sessions of the current user, newest first
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Transcript of the active session, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while a message send is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Switch to another user, dropping everything tied to the previous one
    pub fn set_user(&mut self, user: User) {
        if self.user.as_ref().map(|u| u.id) != Some(user.id) {
            self.reset_sessions();
        }
        self.user = Some(user);
    }

    /// Reset to the logged-out state
    pub fn clear(&mut self) {
        self.user = None;
        self.reset_sessions();
    }

    fn reset_sessions(&mut self) {
        self.active_session = None;
        self.sessions.clear();
        self.messages.clear();
        self.loading.store(false, Ordering::SeqCst);
        self.pending_send = None;
        self.last_error = None;
    }

    fn require_user(&self) -> Result<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| SupportChatError::NotLoggedIn.into())
    }

    fn record_error(&mut self, message: String) {
        tracing::error!("{}", message);
        self.last_error = Some(message);
    }

    /// Reload the current user's sessions
    ///
    /// Sessions belonging to other users are dropped even if the server
    /// returns them. On failure the previous list is kept.
    pub async fn refresh_sessions(&mut self) -> Result<()> {
        let user_id = self.require_user()?.id;
        let result = self.api.list_sessions(Some(user_id)).await;
        match result {
            Ok(mut sessions) => {
                sessions.retain(|s| s.user_id == user_id);
                tracing::debug!("Loaded {} sessions for user {}", sessions.len(), user_id);
                self.sessions = sessions;
                Ok(())
            }
            Err(e) => {
                self.record_error(format!("Failed to fetch sessions: {}", e));
                Err(e)
            }
        }
    }

    /// Open a new session, make it active and reload the session list
    ///
    /// Uses the configured default title when `title` is `None`.
    pub async fn create_session(&mut self, title: Option<String>) -> Result<Session> {
        let user_id = self.require_user()?.id;
        let request = NewSession {
            user_id,
            title: Some(title.unwrap_or_else(|| self.settings.default_session_title.clone())),
        };

        let result = self.api.create_session(&request).await;
        let session = match result {
            Ok(session) => session,
            Err(e) => {
                self.record_error(format!("Failed to create session: {}", e));
                return Err(e);
            }
        };
        tracing::info!("Created session {}", session.id);

        self.select_session(session.clone()).await?;
        if let Err(e) = self.refresh_sessions().await {
            tracing::warn!("Session list is stale after creating a session: {}", e);
        }
        Ok(session)
    }

    /// Make `session` active and load its messages
    pub async fn select_session(&mut self, session: Session) -> Result<()> {
        let session_id = session.id;
        let switching = self.active_session.as_ref().map(|s| s.id) != Some(session_id);
        self.active_session = Some(session);
        if switching {
            self.messages.clear();
        }
        tracing::debug!("Active session is now {}", session_id);
        self.fetch_messages(session_id).await
    }

    /// Make the session with `session_id` active
    ///
    /// Looks in the loaded list first and asks the server otherwise.
    /// Sessions owned by another user are reported as not found.
    pub async fn select_session_by_id(&mut self, session_id: i64) -> Result<Session> {
        let user_id = self.require_user()?.id;
        let session = match self.sessions.iter().find(|s| s.id == session_id) {
            Some(session) => session.clone(),
            None => self.api.get_session(session_id).await?,
        };
        if session.user_id != user_id {
            tracing::warn!(
                "User {} tried to open session {} owned by user {}",
                user_id,
                session_id,
                session.user_id
            );
            return Err(SupportChatError::NotFound("Session not found".to_string()).into());
        }
        self.select_session(session.clone()).await?;
        Ok(session)
    }

    /// Replace the transcript with the server's copy of a session
    ///
    /// Duplicate message ids are dropped, keeping the first occurrence.
    /// On failure the current transcript is kept.
    pub async fn fetch_messages(&mut self, session_id: i64) -> Result<()> {
        let result = self.api.fetch_messages(session_id).await;
        match result {
            Ok(mut messages) => {
                let mut seen = HashSet::new();
                messages.retain(|m| seen.insert(m.id));
                tracing::debug!(
                    "Loaded {} messages for session {}",
                    messages.len(),
                    session_id
                );
                self.messages = messages;
                Ok(())
            }
            Err(e) => {
                self.record_error(format!("Failed to fetch messages: {}", e));
                Err(e)
            }
        }
    }

    fn remove_message(&mut self, id: MessageId) {
        self.messages.retain(|m| m.id != id);
    }

    /// Drop the optimistic entry of a send whose future was cancelled
    fn discard_interrupted_send(&mut self) {
        if let Some(id) = self.pending_send.take() {
            tracing::warn!("Discarding unconfirmed message from an interrupted send");
            self.remove_message(id);
        }
    }

    /// Send a message in the active session
    ///
    /// The message is shown immediately as an optimistic entry. On success
    /// the transcript is reloaded from the server, which replaces that
    /// entry; if the reload fails the entry stays and the reply is appended
    /// locally. On failure the entry is removed, an assistant error message
    /// is appended and the error is returned so the caller can restore the
    /// typed text.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty or over-long input,
    /// `NotLoggedIn`/`NoActiveSession` when there is nowhere to send,
    /// `SendInProgress` while another send is running, and the API error
    /// when the request fails.
    ///
    /// If a previous send was cancelled before the server answered, its
    /// unconfirmed entry is dropped first.
    pub async fn send_message(&mut self, content: &str) -> Result<ChatResponse> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SupportChatError::Validation("Message cannot be empty".to_string()).into());
        }
        let length = content.chars().count();
        if length > self.settings.max_message_length {
            return Err(SupportChatError::Validation(format!(
                "Message is too long ({}/{} characters)",
                length, self.settings.max_message_length
            ))
            .into());
        }

        let user_id = self.require_user()?.id;
        let session_id = self
            .active_session
            .as_ref()
            .map(|s| s.id)
            .ok_or(SupportChatError::NoActiveSession)?;
        if self.is_loading() {
            return Err(SupportChatError::SendInProgress.into());
        }
        self.discard_interrupted_send();

        let optimistic = Message::optimistic(session_id, content);
        let optimistic_id = optimistic.id;
        self.messages.push(optimistic);
        self.pending_send = Some(optimistic_id);
        let _loading = LoadingGuard::start(&self.loading);
        self.last_error = None;

        let request = ChatRequest {
            user_id,
            session_id: Some(session_id),
            message: content.to_string(),
        };
        let result = self.api.send_chat(&request).await;
        self.pending_send = None;
        match result {
            Ok(response) => {
                if response.session_id != session_id {
                    tracing::warn!(
                        "Reply stored in session {} instead of {}",
                        response.session_id,
                        session_id
                    );
                }
                if self.fetch_messages(session_id).await.is_err() {
                    self.messages
                        .push(Message::local(session_id, Sender::Ai, response.message.clone()));
                }
                Ok(response)
            }
            Err(e) => {
                self.remove_message(optimistic_id);
                self.messages
                    .push(Message::local(session_id, Sender::Ai, SEND_FAILED_REPLY));
                self.record_error(format!("Failed to send message: {}", e));
                Err(e)
            }
        }
    }
}
