//! Command-line interface definition for supportchat
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// supportchat - customer support chat from the terminal
///
/// Log in with your email or user ID, open a support session and talk
/// to the support assistant.
#[derive(Parser, Debug, Clone)]
#[command(name = "supportchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the chat API base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Override the local store database path
    #[arg(long)]
    pub store_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with an email address or numeric user ID
    Login {
        /// Email address or user ID
        identifier: String,

        /// Create the account when no user has this email
        #[arg(short, long)]
        register: bool,
    },

    /// Forget the logged-in user
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage chat sessions
    Sessions {
        /// Session subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Print the message history of a session
    Messages {
        /// Session ID
        session_id: i64,
    },

    /// Send a single message and print the reply
    Send {
        /// Session to send to; the newest session when omitted
        #[arg(short, long)]
        session: Option<i64>,

        /// Message text
        message: String,
    },

    /// Start an interactive support chat
    Chat {
        /// Resume a specific session
        #[arg(short, long, conflicts_with = "new")]
        session: Option<i64>,

        /// Always start a new session
        #[arg(short, long)]
        new: bool,

        /// Continue as a new guest user when nobody is logged in
        #[arg(short, long)]
        guest: bool,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List your sessions, newest first
    List,

    /// Open a new session
    New {
        /// Session title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Show one session
    Show {
        /// Session ID
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
