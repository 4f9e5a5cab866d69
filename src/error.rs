//! Error types for supportchat
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for supportchat operations
///
/// Covers configuration problems, input validation, chat API failures,
/// local storage failures, and the state preconditions of the chat
/// container (no user, no session, send already running).
#[derive(Error, Debug)]
pub enum SupportChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// The API answered 404 for the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API answered with a non-success status other than 404
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the server
        status: u16,
        /// `detail` field of the error body, or the raw body
        message: String,
    },

    /// No user is logged in
    #[error("Not logged in. Run `supportchat login <email or user id>` first")]
    NotLoggedIn,

    /// No session is selected
    #[error("No session selected")]
    NoActiveSession,

    /// A message is already being sent
    #[error("A message is already being sent")]
    SendInProgress,

    /// Local storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SupportChatError {
    /// Returns true when the error is an API 404
    ///
    /// Works through `anyhow::Error` so callers holding the crate `Result`
    /// alias can branch on a missing resource.
    ///
    /// # Examples
    ///
    /// ```
    /// use supportchat::error::SupportChatError;
    ///
    /// let err: anyhow::Error = SupportChatError::NotFound("User not found".into()).into();
    /// assert!(SupportChatError::is_not_found(&err));
    /// ```
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<SupportChatError>(),
            Some(SupportChatError::NotFound(_))
        )
    }
}

/// Result type alias for supportchat operations
///
/// Uses `anyhow::Error` so errors can carry context while still being
/// downcast to [`SupportChatError`] where a caller needs to branch.
pub type Result<T> = anyhow::Result<T>;
