//! Heatcheck CLI - Database migrations and scan cache tools.
//!
//! # Usage
//!
//! ```bash
//! # Run intake database migrations
//! hc-cli migrate
//!
//! # Resolve a code through the full pipeline
//! hc-cli resolve 012345678905
//!
//! # Inspect a scan cache entry without counting a hit
//! hc-cli cache show 012345678905
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `resolve` - Resolve a scanned code and print the result
//! - `cache show` - Show a scan cache entry

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hc-cli")]
#[command(author, version, about = "Heatcheck CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run intake database migrations
    Migrate,
    /// Resolve a scanned code through cache, registry and marketplace
    Resolve {
        /// Barcode, style code or free text
        code: String,
    },
    /// Inspect the scan cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the entry bound to a code (does not count a hit)
    Show {
        /// The scanned code
        code: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::intake().await?,
        Commands::Resolve { code } => commands::scan::resolve(&code).await?,
        Commands::Cache { action } => match action {
            CacheAction::Show { code } => commands::scan::show_cache_entry(&code).await?,
        },
    }
    Ok(())
}
