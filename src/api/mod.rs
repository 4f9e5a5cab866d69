//! Client for the support chat REST API
//!
//! [`ChatApi`] is the seam between the chat state and the network.
//! [`HttpChatApi`] implements it over `reqwest` against the
//! `/api/chat/...` endpoints. [`fake::FakeChatApi`] is an in-memory
//! backend for tests.

use crate::config::ApiConfig;
use crate::error::{Result, SupportChatError};
use crate::models::{
    ChatRequest, ChatResponse, Message, NewMessage, NewSession, NewUser, Session, User,
};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub mod fake;

/// Path prefix of every chat endpoint
const API_PREFIX: [&str; 2] = ["api", "chat"];

/// Operations offered by the support chat API
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /api/chat/users/`
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    /// `GET /api/chat/users/{id}`
    async fn get_user(&self, user_id: i64) -> Result<User>;

    /// `GET /api/chat/users/by-email/{email}`
    async fn get_user_by_email(&self, email: &str) -> Result<User>;

    /// `POST /api/chat/sessions/`
    async fn create_session(&self, session: &NewSession) -> Result<Session>;

    /// `GET /api/chat/sessions/?user_id=`
    ///
    /// The server returns newest sessions first.
    async fn list_sessions(&self, user_id: Option<i64>) -> Result<Vec<Session>>;

    /// `GET /api/chat/sessions/{id}`
    async fn get_session(&self, session_id: i64) -> Result<Session>;

    /// `GET /api/chat/sessions/{id}/messages`, oldest first
    async fn fetch_messages(&self, session_id: i64) -> Result<Vec<Message>>;

    /// `POST /api/chat/messages/`: store a message without a reply
    async fn post_message(&self, message: &NewMessage) -> Result<Message>;

    /// `POST /api/chat/`: store the user message and get the assistant reply
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// FastAPI error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP implementation of [`ChatApi`]
///
/// # Examples
///
/// ```
/// use supportchat::api::HttpChatApi;
/// use supportchat::config::ApiConfig;
///
/// let api = HttpChatApi::new(&ApiConfig::default()).unwrap();
/// assert_eq!(api.base_url().as_str(), "http://localhost:8000/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
}

impl HttpChatApi {
    /// Create a client for the configured API
    ///
    /// # Errors
    ///
    /// Returns error if the base URL does not parse or the HTTP client
    /// cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            SupportChatError::Config(format!("Invalid API base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SupportChatError::Config(format!(
                "API base URL cannot have paths joined onto it: {}",
                config.base_url
            ))
            .into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("supportchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SupportChatError::Http)?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL under `/api/chat/`
    ///
    /// Each segment is percent-encoded on its own, so an email address stays
    /// a single path segment. A trailing `""` segment yields a trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                SupportChatError::Config(format!("Invalid API base URL: {}", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(API_PREFIX);
            path.extend(segments);
        }
        Ok(url)
    }

    /// Send a request and decode the JSON body of a success response
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Request for {} failed: {}", what, e);
            SupportChatError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            if status == StatusCode::NOT_FOUND {
                tracing::debug!("{} not found: {}", what, message);
                return Err(SupportChatError::NotFound(message).into());
            }
            tracing::error!("Chat API returned {} for {}: {}", status, what, message);
            return Err(SupportChatError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to decode {} response: {}", what, e);
            SupportChatError::Http(e).into()
        })
    }
}

/// Extract the `detail` of a FastAPI error body, falling back to the raw body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.detail {
            serde_json::Value::String(detail) => detail,
            other => other.to_string(),
        };
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let url = self.endpoint(&["users", ""])?;
        tracing::debug!("Creating user {}", user.email);
        self.execute(self.client.post(url).json(user), "user").await
    }

    async fn get_user(&self, user_id: i64) -> Result<User> {
        let url = self.endpoint(&["users", &user_id.to_string()])?;
        tracing::debug!("Fetching user {}", user_id);
        self.execute(self.client.get(url), "user").await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let url = self.endpoint(&["users", "by-email", email])?;
        tracing::debug!("Fetching user by email {}", email);
        self.execute(self.client.get(url), "user").await
    }

    async fn create_session(&self, session: &NewSession) -> Result<Session> {
        let url = self.endpoint(&["sessions", ""])?;
        tracing::debug!("Creating session for user {}", session.user_id);
        self.execute(self.client.post(url).json(session), "session")
            .await
    }

    async fn list_sessions(&self, user_id: Option<i64>) -> Result<Vec<Session>> {
        let url = self.endpoint(&["sessions", ""])?;
        let mut request = self.client.get(url);
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        tracing::debug!("Listing sessions for user {:?}", user_id);
        self.execute(request, "sessions").await
    }

    async fn get_session(&self, session_id: i64) -> Result<Session> {
        let url = self.endpoint(&["sessions", &session_id.to_string()])?;
        tracing::debug!("Fetching session {}", session_id);
        self.execute(self.client.get(url), "session").await
    }

    async fn fetch_messages(&self, session_id: i64) -> Result<Vec<Message>> {
        let url = self.endpoint(&["sessions", &session_id.to_string(), "messages"])?;
        tracing::debug!("Fetching messages for session {}", session_id);
        self.execute(self.client.get(url), "messages").await
    }

    async fn post_message(&self, message: &NewMessage) -> Result<Message> {
        let url = self.endpoint(&["messages", ""])?;
        tracing::debug!("Storing {} message in session {}", message.sender, message.session_id);
        self.execute(self.client.post(url).json(message), "message")
            .await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.endpoint(&[""])?;
        tracing::debug!(
            "Sending chat message for user {} in session {:?}",
            request.user_id,
            request.session_id
        );
        self.execute(self.client.post(url).json(request), "chat reply")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> HttpChatApi {
        HttpChatApi::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let api = api("http://localhost:8000");
        let url = api.endpoint(&["users", ""]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chat/users/");

        let url = api.endpoint(&[""]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chat/");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = api("https://example.com/support/");
        let url = api.endpoint(&["sessions", "5", "messages"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/support/api/chat/sessions/5/messages"
        );
    }

    #[test]
    fn test_endpoint_encodes_email_as_one_segment() {
        let api = api("http://localhost:8000");
        let url = api
            .endpoint(&["users", "by-email", "a/b?c#d@example.com"])
            .unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 5);
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_base() {
        let result = HttpChatApi::new(&ApiConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"detail":"User not found"}"#),
            "User not found"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_error_message_structured_detail() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"field required"}]}"#;
        let message = error_message(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(message.contains("field required"));
    }
}
