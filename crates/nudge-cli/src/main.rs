use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "nudge", version, about = "Nudge notification engine CLI")]
struct Cli {
    /// Directory holding config.toml and nudge.db (overrides NUDGE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed an incoming message into the engine
    Message(commands::events::MessageArgs),
    /// Mark a conversation as read
    Read {
        /// Conversation token
        token: String,
    },
    /// Show tracked conversations
    Status {
        /// Only show this conversation
        token: Option<String>,
    },
    /// Run one reminder scan
    Scan(commands::scan::ScanArgs),
    /// Run the reminder scheduler until interrupted
    Watch(commands::scan::WatchArgs),
    /// Forget tracked conversations
    Clear(commands::status::ClearArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(dir) = &cli.data_dir {
        std::env::set_var("NUDGE_DATA_DIR", dir);
    }

    let result = match cli.command {
        Commands::Message(args) => commands::events::run_message(args),
        Commands::Read { token } => commands::events::run_read(&token),
        Commands::Status { token } => commands::status::run_status(token.as_deref()),
        Commands::Scan(args) => commands::scan::run_scan(args),
        Commands::Watch(args) => commands::scan::run_watch(args),
        Commands::Clear(args) => commands::status::run_clear(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
