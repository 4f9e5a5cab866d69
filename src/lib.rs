//! supportchat - customer support chat client library
//!
//! This library provides a terminal client for a customer-support chat
//! REST API: user identification, session management, message history and
//! message sending, plus the client-side state that ties them together.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `models`: Users, sessions, messages and request bodies
//! - `api`: The `ChatApi` trait, its HTTP implementation and a test fake
//! - `storage`: Local key/value store holding the logged-in user
//! - `identity`: Login by email or user ID, registration, guest users
//! - `state`: Chat state with optimistic sends and error recovery
//! - `render`: Terminal output
//! - `commands`: CLI command handlers and the interactive chat loop
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use supportchat::api::HttpChatApi;
//! use supportchat::{ChatState, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let api = Arc::new(HttpChatApi::new(&config.api)?);
//!     let state = ChatState::new(api, config.chat.clone());
//!     assert!(state.user().is_none());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod render;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use api::{ChatApi, HttpChatApi};
pub use config::Config;
pub use error::{Result, SupportChatError};
pub use models::{Message, MessageId, Sender, Session, User};
pub use state::ChatState;
pub use storage::LocalStore;
