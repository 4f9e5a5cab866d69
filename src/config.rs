//! Configuration management for supportchat
//!
//! Configuration is loaded from a YAML file, then overridden by environment
//! variables and finally by command-line flags.

use crate::error::{Result, SupportChatError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chat API connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chat behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Chat API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/api/chat/...` paths are joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Chat behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Title given to sessions created from the client
    #[serde(default = "default_session_title")]
    pub default_session_title: String,

    /// Longest message (in characters) the composer accepts
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_session_title() -> String {
    "New Support Chat".to_string()
}

fn default_max_message_length() -> usize {
    500
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_session_title: default_session_title(),
            max_message_length: default_max_message_length(),
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file for the local store; platform data dir when unset
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SupportChatError::Config(format!("Failed to read config file: {}", e))
        })?;
        serde_yaml::from_str(&contents)
            .map_err(|e| SupportChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("SUPPORTCHAT_API_BASE") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("SUPPORTCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid SUPPORTCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(title) = std::env::var("SUPPORTCHAT_DEFAULT_TITLE") {
            self.chat.default_session_title = title;
        }

        if let Ok(max_len) = std::env::var("SUPPORTCHAT_MAX_MESSAGE_LENGTH") {
            if let Ok(value) = max_len.parse() {
                self.chat.max_message_length = value;
            } else {
                tracing::warn!("Invalid SUPPORTCHAT_MAX_MESSAGE_LENGTH: {}", max_len);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.api_base {
            tracing::debug!("Using API base override from CLI: {}", base_url);
            self.api.base_url = base_url.clone();
        }

        if let Some(store_path) = &cli.store_path {
            self.storage.path = Some(store_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not an http(s) URL, or if the
    /// timeout or message length limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(
                SupportChatError::Config("api.base_url cannot be empty".to_string()).into(),
            );
        }

        let url = Url::parse(&self.api.base_url).map_err(|e| {
            SupportChatError::Config(format!(
                "Invalid api.base_url {}: {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SupportChatError::Config(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(SupportChatError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.max_message_length == 0 {
            return Err(SupportChatError::Config(
                "chat.max_message_length must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
