/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `account`: login, logout and whoami
- `sessions`: list, create and show sessions
- `messages`: print a session transcript
- `send`: one-shot message send
- `chat`: interactive chat mode

Handlers build the HTTP client and local store from the configuration and
drive the library components (`identity`, `state`, `render`).
*/

use crate::api::{ChatApi, HttpChatApi};
use crate::config::Config;
use crate::error::{Result, SupportChatError};
use crate::models::User;
use crate::storage::LocalStore;
use std::sync::Arc;

// Special commands parser for interactive chat
pub mod special_commands;

/// Build the API client and open the local store
fn connect(config: &Config) -> Result<(Arc<dyn ChatApi>, LocalStore)> {
    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(&config.api)?);
    let store = LocalStore::open(config.storage.path.as_deref())?;
    Ok((api, store))
}

/// The cached user, or `NotLoggedIn`
fn require_cached_user(store: &LocalStore) -> Result<User> {
    store
        .load_user()?
        .ok_or_else(|| SupportChatError::NotLoggedIn.into())
}

// Login, logout and whoami
pub mod account {
    use super::*;
    use crate::identity::{self, LoginOutcome};
    use crate::render;
    use colored::Colorize;

    /// Log in with an email address or user ID
    ///
    /// With `register`, a missing email account is created.
    pub async fn run_login(config: &Config, identifier: &str, register: bool) -> Result<()> {
        let (api, store) = connect(config)?;
        let user = login_or_register(api.as_ref(), &store, identifier, register).await?;
        println!(
            "{}",
            format!("Logged in as {}", user.display_name()).green()
        );
        render::print_user(&user);
        Ok(())
    }

    /// Login flow shared by the `login` command and tests
    ///
    /// # Errors
    ///
    /// Returns `NotFound` with a hint when the user does not exist and
    /// cannot or may not be registered.
    pub async fn login_or_register(
        api: &dyn ChatApi,
        store: &LocalStore,
        identifier: &str,
        register: bool,
    ) -> Result<User> {
        match identity::login(api, store, identifier).await? {
            LoginOutcome::LoggedIn(user) => Ok(user),
            LoginOutcome::NotFound { can_register: true } if register => {
                identity::register(api, store, identifier).await
            }
            LoginOutcome::NotFound { can_register: true } => Err(SupportChatError::NotFound(
                "User not found. Run again with --register to create an account with this email"
                    .to_string(),
            )
            .into()),
            LoginOutcome::NotFound {
                can_register: false,
            } => Err(SupportChatError::NotFound(
                "User not found. Check your user ID or log in with your email instead"
                    .to_string(),
            )
            .into()),
        }
    }

    /// Forget the cached user
    pub fn run_logout(config: &Config) -> Result<()> {
        let store = LocalStore::open(config.storage.path.as_deref())?;
        identity::logout(&store)?;
        println!("{}", "Logged out.".green());
        Ok(())
    }

    /// Show the cached user
    pub fn run_whoami(config: &Config) -> Result<()> {
        let store = LocalStore::open(config.storage.path.as_deref())?;
        match store.load_user()? {
            Some(user) => render::print_user(&user),
            None => println!("{}", "Not logged in.".yellow()),
        }
        Ok(())
    }
}

// Session management
pub mod sessions {
    use super::*;
    use crate::cli::SessionCommand;
    use crate::render;
    use crate::state::ChatState;
    use colored::Colorize;

    /// Handle `sessions` subcommands
    pub async fn handle_sessions(config: &Config, command: SessionCommand) -> Result<()> {
        let (api, store) = connect(config)?;
        let user = require_cached_user(&store)?;

        match command {
            SessionCommand::List => {
                let mut state = ChatState::new(api, config.chat.clone());
                state.set_user(user);
                state.refresh_sessions().await?;
                render::print_sessions(state.sessions(), None);
            }
            SessionCommand::New { title } => {
                let mut state = ChatState::new(api, config.chat.clone());
                state.set_user(user);
                let session = state.create_session(title).await?;
                println!(
                    "{}",
                    format!(
                        "Created session {} ({})",
                        session.id,
                        session.display_title()
                    )
                    .green()
                );
            }
            SessionCommand::Show { id } => {
                let session = api.get_session(id).await?;
                println!("{}", render::session_header(&session, &user));
                if let Some(opened) = session.opened_at() {
                    println!("Created: {}", render::format_timestamp(opened));
                }
                if session.user_id != user.id {
                    println!("{}", "This session belongs to another user.".yellow());
                }
            }
        }

        Ok(())
    }
}

// Transcript printing
pub mod messages {
    use super::*;
    use crate::render;
    use crate::state::ChatState;

    /// Print the messages of one of the user's sessions
    pub async fn show_messages(config: &Config, session_id: i64) -> Result<()> {
        let (api, store) = connect(config)?;
        let user = require_cached_user(&store)?;

        let mut state = ChatState::new(api, config.chat.clone());
        state.set_user(user);
        state.select_session_by_id(session_id).await?;
        render::print_transcript(state.messages());
        Ok(())
    }
}

// One-shot send
pub mod send {
    use super::*;
    use crate::render;
    use crate::state::ChatState;
    use colored::Colorize;

    /// Send one message and print the reply
    ///
    /// Without `session_id` the newest session is used, or a new one is
    /// opened when the user has none.
    pub async fn run_send(config: &Config, session_id: Option<i64>, message: &str) -> Result<()> {
        let (api, store) = connect(config)?;
        let user = require_cached_user(&store)?;

        let mut state = ChatState::new(api, config.chat.clone());
        state.set_user(user);
        open_session(&mut state, session_id).await?;

        let response = state.send_message(message).await?;
        if let Some(reply) = state.messages().last() {
            println!("{}", render::format_message(reply));
        } else {
            println!("{} {}", "Support:".green().bold(), response.message);
        }
        Ok(())
    }

    /// Select `session_id`, else the newest session, else a new one
    pub async fn open_session(state: &mut ChatState, session_id: Option<i64>) -> Result<()> {
        if let Some(id) = session_id {
            state.select_session_by_id(id).await?;
            return Ok(());
        }

        state.refresh_sessions().await?;
        match state.sessions().first().cloned() {
            Some(newest) => state.select_session(newest).await,
            None => state.create_session(None).await.map(|_| ()),
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Restores the logged-in user, opens a session and runs a
    //! readline-based loop that sends every line to support.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::identity;
    use crate::models::{Message, Sender};
    use crate::render;
    use crate::state::ChatState;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `session_id` - Session to resume
    /// * `new_session` - Always open a new session
    /// * `guest` - Create a guest user when nobody is logged in
    pub async fn run_chat(
        config: Config,
        session_id: Option<i64>,
        new_session: bool,
        guest: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");
        let (api, store) = connect(&config)?;

        let user = if guest {
            identity::restore_or_create_guest(api.as_ref(), &store).await?
        } else {
            require_cached_user(&store)?
        };

        let mut state = ChatState::new(api, config.chat.clone());
        state.set_user(user);

        if new_session {
            state.create_session(None).await?;
        } else {
            super::send::open_session(&mut state, session_id).await?;
        }

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&state);
        render::print_transcript(state.messages());

        loop {
            match rl.readline(&format!("{} ", ">".cyan().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::None => send_line(&mut state, trimmed).await,
                        SpecialCommand::Exit => break,
                        SpecialCommand::Logout => {
                            identity::logout(&store)?;
                            state.clear();
                            println!("{}", "Logged out. Goodbye!".green());
                            return Ok(());
                        }
                        other => {
                            if let Err(e) = handle_special_command(&mut state, other).await {
                                eprintln!("{}", format!("Error: {}", e).red());
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Send one line and print the reply, or the failure notice
    async fn send_line(state: &mut ChatState, text: &str) {
        let before = state.messages().len();
        match state.send_message(text).await {
            Ok(_) => {
                // Readline already echoed the user's line; print only the replies.
                let replies: Vec<&Message> = state
                    .messages()
                    .iter()
                    .rev()
                    .take_while(|m| m.sender == Sender::Ai)
                    .collect();
                for reply in replies.into_iter().rev() {
                    println!("{}", render::format_message(reply));
                }
            }
            Err(e) => {
                if state.messages().len() > before {
                    if let Some(notice) = state.messages().last() {
                        println!("{}", render::format_message(notice));
                    }
                    eprintln!(
                        "{}",
                        "Your message is in the history (press Up to retry).".dimmed()
                    );
                }
                eprintln!("{}", format!("Error: {}", e).red());
            }
        }
    }

    /// Run a session-control command against the state
    pub async fn handle_special_command(
        state: &mut ChatState,
        command: SpecialCommand,
    ) -> Result<()> {
        match command {
            SpecialCommand::ListSessions => {
                state.refresh_sessions().await?;
                render::print_sessions(state.sessions(), state.active_session().map(|s| s.id));
            }
            SpecialCommand::NewSession(title) => {
                let session = state.create_session(title).await?;
                println!(
                    "{}",
                    format!("Started session {} ({})", session.id, session.display_title())
                        .green()
                );
            }
            SpecialCommand::SwitchSession(id) => {
                let session = state.select_session_by_id(id).await?;
                println!(
                    "{}",
                    format!("Switched to session {} ({})", session.id, session.display_title())
                        .green()
                );
                render::print_transcript(state.messages());
            }
            SpecialCommand::History => render::print_transcript(state.messages()),
            SpecialCommand::Refresh => {
                if let Some(id) = state.active_session().map(|s| s.id) {
                    state.fetch_messages(id).await?;
                }
                state.refresh_sessions().await?;
                render::print_transcript(state.messages());
            }
            SpecialCommand::WhoAmI => {
                if let Some(user) = state.user() {
                    render::print_user(user);
                }
                match state.active_session() {
                    Some(session) => println!(
                        "{} {} ({})",
                        "Session:".bold(),
                        session.id,
                        session.display_title()
                    ),
                    None => println!("{}", "No session selected".yellow()),
                }
            }
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit | SpecialCommand::Logout | SpecialCommand::None => {}
        }
        Ok(())
    }

    fn print_welcome_banner(state: &ChatState) {
        println!();
        println!("{}", "Customer Support Chat".bold());
        if let (Some(session), Some(user)) = (state.active_session(), state.user()) {
            println!("{}", render::session_header(session, user));
        }
        println!(
            "{}",
            "Type your message and press Enter. /help lists commands, exit leaves.".dimmed()
        );
        println!();
    }
}
