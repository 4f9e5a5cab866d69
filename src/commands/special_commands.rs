//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` control the chat session instead of being sent
//! to support. Command names are case-insensitive; arguments keep their
//! case. `exit` and `quit` work without the slash.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands available during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// List the user's sessions
    ListSessions,

    /// Open a new session, optionally titled
    NewSession(Option<String>),

    /// Switch to another session by ID
    SwitchSession(i64),

    /// Reprint the transcript of the active session
    History,

    /// Reload the transcript and session list from the server
    Refresh,

    /// Show the logged-in user and active session
    WhoAmI,

    /// Forget the cached user and leave
    Logout,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the text as a message
    None,
}

/// Parse a line of user input into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` for unrecognized `/` commands,
/// `MissingArgument` when `/switch` has no ID and `UnsupportedArgument`
/// when its ID is not a number or a command takes no argument.
///
/// # Examples
///
/// ```
/// use supportchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/switch 12").unwrap(), SpecialCommand::SwitchSession(12));
/// assert_eq!(parse_special_command("hello there").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "exit" || lower == "quit" {
        return Ok(SpecialCommand::Exit);
    }
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), Some(arg.trim())),
        None => (lower, None),
    };
    let arg = arg.filter(|a| !a.is_empty());

    let no_arg = |command: SpecialCommand| match arg {
        Some(extra) => Err(CommandError::UnsupportedArgument {
            command: name.clone(),
            arg: extra.to_string(),
        }),
        None => Ok(command),
    };

    match name.as_str() {
        "/sessions" => no_arg(SpecialCommand::ListSessions),
        "/new" => Ok(SpecialCommand::NewSession(arg.map(str::to_string))),
        "/switch" => match arg {
            None => Err(CommandError::MissingArgument {
                command: "/switch".to_string(),
                usage: "/switch <session id>".to_string(),
            }),
            Some(id) => id
                .parse()
                .map(SpecialCommand::SwitchSession)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/switch".to_string(),
                    arg: id.to_string(),
                }),
        },
        "/history" => no_arg(SpecialCommand::History),
        "/refresh" => no_arg(SpecialCommand::Refresh),
        "/whoami" | "/status" => no_arg(SpecialCommand::WhoAmI),
        "/logout" => no_arg(SpecialCommand::Logout),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" => no_arg(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Display help for interactive chat
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /sessions       - List your support sessions
  /new [title]    - Start a new session
  /switch <id>    - Continue another session
  /history        - Show the messages of this session again
  /refresh        - Reload messages and sessions from the server

ACCOUNT:
  /whoami         - Show who you are logged in as
  /status         - Same as /whoami
  /logout         - Forget the saved login and leave

SESSION CONTROL:
  /help           - Show this help message
  /?              - Same as /help
  exit            - Leave the chat
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Anything not starting with / is sent to support
"#
    );
}
