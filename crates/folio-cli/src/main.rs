//! Folio CLI - sign in to Folio from the terminal.

mod commands;
mod output;
mod terminal;

use clap::{Parser, Subcommand};
use folio_config::{init_logging, Config, Paths};
use tracing::debug;

/// Folio CLI - manage your Folio session.
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio CLI for account and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username and password
    Login {
        /// Username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Create an account
    Register {
        /// Username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
        /// Email address (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Show the signed-in user
    Whoami,

    /// Sign in with Google in the browser
    Google,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging("cli", level, &paths);
    debug!(api_url = %config.api_url, "Starting folio");

    let controller = commands::connect(&paths, &config, cli.format)?;

    match cli.command {
        Commands::Login { username } => commands::login(&controller, username, cli.format).await,
        Commands::Register { username, email } => {
            commands::register(&controller, username, email, cli.format).await
        }
        Commands::Logout => commands::logout(&controller).await,
        Commands::Status => commands::status(&controller, cli.format).await,
        Commands::Whoami => commands::whoami(&controller, cli.format).await,
        Commands::Google => commands::google(&controller, cli.format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        if commands::needs_report(&e) {
            output::print_error(&e.to_string(), format);
        }
        std::process::exit(1);
    }
}
