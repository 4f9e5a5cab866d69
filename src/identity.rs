//! User identification
//!
//! Users log in with either an email address or a numeric user ID. A
//! successful login is cached in the [`LocalStore`] so later runs start
//! already identified.

use crate::api::ChatApi;
use crate::error::{Result, SupportChatError};
use crate::models::{NewUser, User};
use crate::storage::LocalStore;

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

/// What kind of identifier the user typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Anything containing `@`
    Email(String),
    /// All ASCII digits
    UserId(i64),
    /// Neither of the above
    Unknown(String),
}

fn user_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("valid user id pattern"))
}

impl Identifier {
    /// Classify trimmed input
    ///
    /// # Examples
    ///
    /// ```
    /// use supportchat::identity::Identifier;
    ///
    /// assert_eq!(
    ///     Identifier::detect(" ada@example.com "),
    ///     Identifier::Email("ada@example.com".into())
    /// );
    /// assert_eq!(Identifier::detect("1042"), Identifier::UserId(1042));
    /// assert!(matches!(Identifier::detect("ada"), Identifier::Unknown(_)));
    /// ```
    pub fn detect(input: &str) -> Self {
        let input = input.trim();
        if input.contains('@') {
            return Self::Email(input.to_string());
        }
        if user_id_pattern().is_match(input) {
            // Digit strings too long for i64 cannot be a user id.
            if let Ok(id) = input.parse() {
                return Self::UserId(id);
            }
        }
        Self::Unknown(input.to_string())
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email(_))
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The user exists and is now cached
    LoggedIn(User),
    /// No such user; only email identifiers can be registered
    NotFound { can_register: bool },
}

/// Look a user up by email or ID and cache them on success
///
/// # Errors
///
/// Returns a validation error for empty or unrecognized input, and any
/// API or storage error other than 404
pub async fn login(api: &dyn ChatApi, store: &LocalStore, input: &str) -> Result<LoginOutcome> {
    if input.trim().is_empty() {
        return Err(
            SupportChatError::Validation("Please enter your email or user ID".to_string()).into(),
        );
    }

    let identifier = Identifier::detect(input);
    let lookup = match &identifier {
        Identifier::Email(email) => api.get_user_by_email(email).await,
        Identifier::UserId(id) => api.get_user(*id).await,
        Identifier::Unknown(_) => {
            return Err(SupportChatError::Validation(
                "Please enter a valid email address or numeric user ID".to_string(),
            )
            .into())
        }
    };

    match lookup {
        Ok(user) => {
            store.save_user(&user)?;
            tracing::info!("Logged in as user {}", user.id);
            Ok(LoginOutcome::LoggedIn(user))
        }
        Err(e) if SupportChatError::is_not_found(&e) => {
            tracing::info!("No user found for {:?}", identifier);
            Ok(LoginOutcome::NotFound {
                can_register: identifier.is_email(),
            })
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            Err(e)
        }
    }
}

/// Create a user from an email address and cache them
///
/// The new user's name is the part of the address before `@`.
pub async fn register(api: &dyn ChatApi, store: &LocalStore, input: &str) -> Result<User> {
    let email = match Identifier::detect(input) {
        Identifier::Email(email) => email,
        _ => {
            return Err(SupportChatError::Validation(
                "Can only create new users with email address".to_string(),
            )
            .into())
        }
    };

    let name = email.split('@').next().unwrap_or_default().to_string();
    let user = api.create_user(&NewUser { name, email }).await?;
    store.save_user(&user)?;
    tracing::info!("Registered user {}", user.id);
    Ok(user)
}

/// Return the cached user, or create and cache a guest user
pub async fn restore_or_create_guest(api: &dyn ChatApi, store: &LocalStore) -> Result<User> {
    if let Some(user) = store.load_user()? {
        tracing::debug!("Restored cached user {}", user.id);
        return Ok(user);
    }

    let guest = NewUser {
        name: "Guest".to_string(),
        email: format!("guest_{}@example.com", Utc::now().timestamp_millis()),
    };
    let user = api.create_user(&guest).await?;
    store.save_user(&user)?;
    tracing::info!("Created guest user {}", user.id);
    Ok(user)
}

/// Forget the cached user
pub fn logout(store: &LocalStore) -> Result<()> {
    store.clear_user()?;
    tracing::info!("Logged out");
    Ok(())
}
