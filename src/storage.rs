//! Local key/value store
//!
//! Keeps small client-side values across runs, the way a browser keeps
//! `localStorage`. The logged-in user lives under [`USER_KEY`].

use crate::error::{Result, SupportChatError};
use crate::models::User;
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Key the logged-in user is cached under
pub const USER_KEY: &str = "chat_user";

/// Environment variable overriding the store location
pub const STORE_PATH_ENV: &str = "SUPPORTCHAT_STORE_DB";

/// SQLite-backed key/value store
#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    /// Open the store in the user's data directory
    ///
    /// `SUPPORTCHAT_STORE_DB` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var(STORE_PATH_ENV) {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "supportchat", "supportchat").ok_or_else(|| {
            SupportChatError::Storage("Could not determine data directory".into())
        })?;

        Self::new_with_path(proj_dirs.data_dir().join("store.db"))
    }

    /// Open the store at `configured` when set, else at the default location
    pub fn open(configured: Option<&str>) -> Result<Self> {
        match configured {
            Some(path) => Self::new_with_path(path),
            None => Self::new(),
        }
    }

    /// Open the store at a specific database path
    ///
    /// # Examples
    ///
    /// ```
    /// use supportchat::storage::LocalStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = LocalStore::new_with_path(dir.path().join("store.db")).unwrap();
    /// store.set_item("theme", "dark").unwrap();
    /// assert_eq!(store.get_item("theme").unwrap().as_deref(), Some("dark"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create parent directory for database")
                    .map_err(|e| SupportChatError::Storage(e.to_string()))?;
            }
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| SupportChatError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| SupportChatError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read a value
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query local storage")
            .map_err(|e| SupportChatError::Storage(e.to_string()))?;
        Ok(value)
    }

    /// Write a value, replacing any previous one
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .context("Failed to write local storage")
        .map_err(|e| SupportChatError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete a value; missing keys are not an error
    pub fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM local_storage WHERE key = ?", params![key])
            .context("Failed to delete from local storage")
            .map_err(|e| SupportChatError::Storage(e.to_string()))?;
        Ok(())
    }

    /// The cached logged-in user
    ///
    /// A value that no longer parses is logged and treated as absent.
    pub fn load_user(&self) -> Result<Option<User>> {
        let Some(raw) = self.get_item(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached user: {}", e);
                Ok(None)
            }
        }
    }

    /// Cache the logged-in user
    pub fn save_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.set_item(USER_KEY, &raw)?;
        tracing::debug!("Cached user {} in local storage", user.id);
        Ok(())
    }

    /// Forget the logged-in user
    pub fn clear_user(&self) -> Result<()> {
        self.remove_item(USER_KEY)
    }
}
