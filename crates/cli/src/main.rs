//! Cornershop CLI - Database migrations and cart maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront and session-store migrations
//! cornershop-cli migrate
//!
//! # Show a signed-in user's saved cart
//! cornershop-cli cart show --user 6f1c0d1e-8a57-4a4c-9d8e-0f1f2d3c4b5a
//!
//! # Delete a signed-in user's saved cart
//! cornershop-cli cart clear --user 6f1c0d1e-8a57-4a4c-9d8e-0f1f2d3c4b5a
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `cart show` / `cart clear` - Inspect or reset a user's remote cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "cornershop-cli")]
#[command(author, version, about = "Cornershop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect or reset signed-in carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print a user's saved cart lines and totals
    Show {
        /// User ID (subject of the hosted-auth token)
        #[arg(short, long)]
        user: Uuid,
    },
    /// Delete every saved line for a user
    Clear {
        /// User ID (subject of the hosted-auth token)
        #[arg(short, long)]
        user: Uuid,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Cart { action } => match action {
            CartAction::Show { user } => commands::cart::show(user.into()).await?,
            CartAction::Clear { user } => {
                commands::cart::clear(user.into()).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cart_show_requires_uuid() {
        assert!(Cli::try_parse_from(["cornershop-cli", "cart", "show", "--user", "nope"]).is_err());
        assert!(
            Cli::try_parse_from([
                "cornershop-cli",
                "cart",
                "show",
                "--user",
                "6f1c0d1e-8a57-4a4c-9d8e-0f1f2d3c4b5a",
            ])
            .is_ok()
        );
    }
}
