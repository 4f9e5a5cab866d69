//! supportchat - customer support chat from the terminal
//!
//! Main entry point for the supportchat CLI.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use supportchat::cli::{Cli, Commands};
use supportchat::commands;
use supportchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Login {
            identifier,
            register,
        } => {
            tracing::info!("Starting login");
            commands::account::run_login(&config, &identifier, register).await
        }
        Commands::Logout => commands::account::run_logout(&config),
        Commands::Whoami => commands::account::run_whoami(&config),
        Commands::Sessions { command } => {
            commands::sessions::handle_sessions(&config, command).await
        }
        Commands::Messages { session_id } => {
            commands::messages::show_messages(&config, session_id).await
        }
        Commands::Send { session, message } => {
            if let Some(id) = session {
                tracing::debug!("Sending to session {}", id);
            }
            commands::send::run_send(&config, session, &message).await
        }
        Commands::Chat {
            session,
            new,
            guest,
        } => {
            if let Some(id) = session {
                tracing::debug!("Resuming session {}", id);
            }
            commands::chat::run_chat(config, session, new, guest).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs are written to stderr.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "supportchat=debug"
    } else {
        "supportchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
