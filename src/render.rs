//! Terminal rendering of users, sessions and transcripts

use crate::models::{Message, Sender, Session, User};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use prettytable::{format, Table};

/// Local wall-clock form of a server timestamp
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// One transcript line
///
/// Unconfirmed user messages are marked as sending; assistant messages the
/// client made up after a failure are shown in red.
pub fn format_message(message: &Message) -> String {
    let time = message
        .timestamp
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();
    match (message.sender, message.is_local()) {
        (Sender::User, false) => format!("[{}] {} {}", time, "You:".cyan().bold(), message.content),
        (Sender::User, true) => format!(
            "[{}] {} {} {}",
            time,
            "You:".cyan().bold(),
            message.content,
            "(sending)".dimmed()
        ),
        (Sender::Ai, false) => format!(
            "[{}] {} {}",
            time,
            "Support:".green().bold(),
            message.content
        ),
        (Sender::Ai, true) => format!(
            "[{}] {} {}",
            time,
            "Support:".red().bold(),
            message.content.red()
        ),
    }
}

/// Print a whole transcript
pub fn print_transcript(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", "No messages yet. Say hello!".yellow());
        return;
    }
    for message in messages {
        println!("{}", format_message(message));
    }
}

/// Table of sessions with the active one marked
pub fn sessions_table(sessions: &[Session], active: Option<i64>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Created".bold()
    ]);

    for session in sessions {
        let marker = if Some(session.id) == active { "*" } else { "" };
        let title = session.display_title();
        let title = if title.chars().count() > 40 {
            format!("{}...", title.chars().take(37).collect::<String>())
        } else {
            title.to_string()
        };
        let created = session
            .opened_at()
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![marker, session.id.to_string().cyan(), title, created]);
    }

    table
}

/// Print the session list, or a hint when there is none
pub fn print_sessions(sessions: &[Session], active: Option<i64>) {
    if sessions.is_empty() {
        println!("{}", "No sessions yet.".yellow());
        println!(
            "Use {} to start your first conversation.",
            "supportchat sessions new".cyan()
        );
        return;
    }

    println!("\nYour Chat Sessions ({}):", sessions.len());
    sessions_table(sessions, active).printstd();
    println!();
}

/// Print who is logged in
pub fn print_user(user: &User) {
    println!("{} {}", "User ID:".bold(), user.id);
    println!("{} {}", "Name:".bold(), user.display_name());
    println!("{} {}", "Email:".bold(), user.email);
}

/// One-line header for a session
pub fn session_header(session: &Session, user: &User) -> String {
    format!(
        "{} (session {}) - {}",
        session.display_title().bold(),
        session.id,
        user.display_name()
    )
}
