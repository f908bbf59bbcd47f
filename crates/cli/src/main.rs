//! Librería CLI - remote collection seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # Seed the book catalog
//! libreria-cli seed books
//!
//! # Seed the role-assignment documents
//! libreria-cli seed roles
//!
//! # Seed the about page
//! libreria-cli seed about
//!
//! # Seed everything
//! libreria-cli seed all
//! ```
//!
//! The CLI writes through the same gateway client the storefront uses, so
//! `GATEWAY_*` environment variables apply identically (including
//! `GATEWAY_MODE=memory`, which is only useful for a dry run).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "libreria-cli")]
#[command(author, version, about = "Librería CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed remote collections
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed the book catalog
    Books,
    /// Seed the role-assignment documents
    Roles,
    /// Seed the about page
    About,
    /// Seed everything
    All,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed { target } => {
            let gateway = commands::seed::gateway_from_env()?;
            match target {
                SeedTarget::Books => commands::seed::books(&gateway).await?,
                SeedTarget::Roles => commands::seed::roles(&gateway).await?,
                SeedTarget::About => commands::seed::about(&gateway).await?,
                SeedTarget::All => {
                    commands::seed::roles(&gateway).await?;
                    commands::seed::books(&gateway).await?;
                    commands::seed::about(&gateway).await?;
                }
            }
        }
    }
    Ok(())
}
