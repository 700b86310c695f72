//! Stock planning CLI - database migrations and offline planning.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stockplan migrate
//!
//! # Plan from a JSON snapshot, printing the result
//! stockplan plan --input snapshot.json
//!
//! # Plan and write the result to a file
//! stockplan plan --input snapshot.json --output plan.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `plan` - Compute a replenishment plan without a database

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stockplan")]
#[command(author, version, about = "Stock planning CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Compute a replenishment plan from a JSON snapshot
    Plan {
        /// Snapshot file with the planning request and inputs
        #[arg(short, long)]
        input: PathBuf,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so a plan printed to stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockplan=info,stockplan_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Plan { input, output } => {
            commands::plan::run(&input, output.as_deref()).await?;
        }
    }
    Ok(())
}
