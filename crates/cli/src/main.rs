//! Stratum CLI - stratum command

use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod script;
mod source;
mod util;

/// Stratum - Ledger-reconciling migrations for table stores
#[derive(Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a stratum.toml and the migrations directory
    Init,
    /// Scaffold the next migration script
    Create {
        /// Migration name, appended to the sequence prefix
        name: String,
    },
    /// Apply pending migrations
    Up {
        /// Stop after this migration (count or identifier fragment)
        target: Option<String>,
    },
    /// Revert recorded migrations, newest first
    Down {
        /// Accepted for symmetry with up; down always reverts everything
        target: Option<String>,
    },
    /// Revert every ledger record from its stored contents, ignoring
    /// local migration scripts
    Nuclear {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show which migrations have run
    List,
    /// Print the number of pending migrations
    Delta,
    /// Revert everything, then reapply the whole catalog
    Refresh,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // No subcommand runs all pending migrations
    let command = cli.command.unwrap_or(Commands::Up { target: None });

    let result = match command {
        Commands::Init => cmd::init::run().await,
        Commands::Create { name } => cmd::create::run(&name).await,
        Commands::Up { target } => cmd::up::run(target.as_deref()).await,
        Commands::Down { target } => cmd::down::run(target.as_deref()).await,
        Commands::Nuclear { yes } => cmd::nuclear::run(yes).await,
        Commands::List => cmd::list::run().await,
        Commands::Delta => cmd::delta::run().await,
        Commands::Refresh => cmd::refresh::run().await,
    };

    if let Err(err) = result {
        util::print_error(&err);
        std::process::exit(1);
    }
}
