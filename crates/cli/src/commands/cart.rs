//! Signed-in cart maintenance.
//!
//! # Usage
//!
//! ```bash
//! cornershop-cli cart show --user <uuid>
//! cornershop-cli cart clear --user <uuid>
//! ```
//!
//! Anonymous carts live in sessions and are not reachable from here.

use cornershop_core::{CartLine, CartSnapshot, UserId};
use cornershop_storefront::config::{ConfigError, database_url_from_env};
use cornershop_storefront::db::{CartItemRepository, RepositoryError, create_pool};
use thiserror::Error;

/// Errors that can occur during cart maintenance.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// Database URL is not configured.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    /// Query failed or returned unusable rows.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

async fn repository() -> Result<CartItemRepository, CartCommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from_env()?;
    let pool = create_pool(&database_url).await?;
    Ok(CartItemRepository::new(pool))
}

/// Log every saved line for `user` and the cart totals.
///
/// # Errors
///
/// Returns `CartCommandError` if the database is unreachable or holds a row
/// that is not a valid cart line.
pub async fn show(user: UserId) -> Result<(), CartCommandError> {
    let repo = repository().await?;
    let rows = repo.list(user).await?;

    if rows.is_empty() {
        tracing::info!(%user, "No saved cart");
        return Ok(());
    }

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let updated_at = row.updated_at;
        let line = CartLine::try_from(row)?;
        tracing::info!(
            product_id = %line.product_id,
            name = %line.name,
            quantity = line.quantity,
            unit_price = %line.unit_price,
            %updated_at,
            "Cart line"
        );
        lines.push(line);
    }

    let snapshot = CartSnapshot::from_lines(lines);
    tracing::info!(
        %user,
        lines = snapshot.len(),
        items = snapshot.total_item_count(),
        total = %snapshot.total_price(),
        "Saved cart"
    );
    Ok(())
}

/// Delete every saved line for `user`.
///
/// # Returns
///
/// The number of rows deleted.
///
/// # Errors
///
/// Returns `CartCommandError` if the database is unreachable.
pub async fn clear(user: UserId) -> Result<u64, CartCommandError> {
    let repo = repository().await?;
    let deleted = repo.delete_for_user(user).await?;

    tracing::info!(%user, deleted, "Cleared saved cart");
    Ok(deleted)
}
