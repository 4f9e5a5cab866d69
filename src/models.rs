//! Records exchanged with the support chat API
//!
//! Users, sessions and messages are flat records. The server owns every
//! relationship between them; the client only keeps denormalized copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Title shown for sessions the server returned without one
pub const UNTITLED_SESSION: &str = "Untitled Chat";

/// A support-chat user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier
    pub id: i64,
    /// Full name, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Email address
    pub email: String,
}

impl User {
    /// Name to greet the user with
    ///
    /// Falls back from `name` to `first_name` to the email address,
    /// skipping blank values.
    ///
    /// # Examples
    ///
    /// ```
    /// use supportchat::models::User;
    ///
    /// let user = User {
    ///     id: 7,
    ///     name: None,
    ///     first_name: Some("Ada".into()),
    ///     last_name: None,
    ///     email: "ada@example.com".into(),
    /// };
    /// assert_eq!(user.display_name(), "Ada");
    /// ```
    pub fn display_name(&self) -> &str {
        [self.name.as_deref(), self.first_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.email.as_str())
    }
}

/// A conversation thread owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        with = "iso_datetime::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Older servers report `started_at` instead of `created_at`
    #[serde(
        default,
        with = "iso_datetime::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Title to show, with a placeholder for untitled sessions
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED_SESSION,
        }
    }

    /// When the session was opened
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.started_at)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The customer
    User,
    /// The support assistant
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

/// Identifier of a message in the local transcript
///
/// Messages loaded from the server carry their integer id. Entries the
/// client creates itself (optimistic sends, synthesized error replies)
/// get a random local id and are never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Local(Uuid),
}

impl MessageId {
    /// Fresh client-local id
    pub fn local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "{}", id),
            Self::Local(id) => write!(f, "local-{}", id),
        }
    }
}

/// One turn in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: i64,
    pub sender: Sender,
    pub content: String,
    #[serde(with = "iso_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Client-side message that has not been confirmed by the server
    pub fn local(session_id: i64, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            session_id,
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Optimistic entry for a message the user is sending
    pub fn optimistic(session_id: i64, content: impl Into<String>) -> Self {
        Self::local(session_id, Sender::User, content)
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }
}

/// Body of `POST /api/chat/users/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Body of `POST /api/chat/sessions/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Body of `POST /api/chat/messages/`
///
/// Stores a message without generating a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub session_id: i64,
    pub sender: Sender,
    pub content: String,
}

/// Body of `POST /api/chat/`
///
/// When `session_id` is absent the server opens a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    pub message: String,
}

/// Reply of `POST /api/chat/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Session the exchange was stored in
    pub session_id: i64,
    /// The assistant reply text
    pub message: String,
}

/// Serde adapter for the server's ISO-8601 datetimes
///
/// The backend writes naive datetimes (no offset); those are read as UTC.
/// RFC 3339 values are accepted too, and values are written back as RFC 3339.
pub mod iso_datetime {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parse an RFC 3339 or naive ISO-8601 datetime
    ///
    /// # Examples
    ///
    /// ```
    /// use supportchat::models::iso_datetime::parse;
    ///
    /// let naive = parse("2024-03-01T09:30:00.250000").unwrap();
    /// let zoned = parse("2024-03-01T09:30:00.25Z").unwrap();
    /// assert_eq!(naive, zoned);
    /// assert!(parse("yesterday").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    /// Same adapter for optional fields
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
