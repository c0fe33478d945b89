//! Cart item repository for database operations.
//!
//! Rows are keyed by `(user_id, product_id)`; writes are upserts so the cart
//! service never has to know whether a row already exists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use cornershop_core::{CartLine, ProductId, UserId};

use super::RepositoryError;
use crate::cart::RemoteCartItems;

/// A `storefront.cart_item` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItemRow {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub image_ref: String,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart item {} has quantity {}",
                    row.product_id, row.quantity
                ))
            })?;

        if row.unit_price.is_sign_negative() {
            return Err(RepositoryError::DataCorruption(format!(
                "cart item {} has negative price {}",
                row.product_id, row.unit_price
            )));
        }

        Ok(Self {
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            image_ref: row.image_ref,
            quantity,
        })
    }
}

/// Repository for signed-in cart rows.
///
/// Owns a pool handle (cheap to clone) so writes can run on detached tasks.
#[derive(Clone)]
pub struct CartItemRepository {
    pool: PgPool,
}

impl CartItemRepository {
    /// Create a new cart item repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get all rows for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<CartItemRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT product_id, name, unit_price, image_ref, quantity, updated_at
            FROM storefront.cart_item
            WHERE user_id = $1
            ORDER BY created_at ASC, product_id ASC
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Delete all rows for a user.
    ///
    /// # Returns
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_user(&self, user: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_item
            WHERE user_id = $1
            ",
        )
        .bind(user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

impl RemoteCartItems for CartItemRepository {
    async fn fetch_all(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        self.list(user)
            .await?
            .into_iter()
            .map(CartLine::try_from)
            .collect()
    }

    async fn upsert(&self, user: UserId, line: &CartLine) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(line.quantity).unwrap_or(i32::MAX);

        sqlx::query(
            r"
            INSERT INTO storefront.cart_item
                (user_id, product_id, name, unit_price, image_ref, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET name = EXCLUDED.name,
                unit_price = EXCLUDED.unit_price,
                image_ref = EXCLUDED.image_ref,
                quantity = EXCLUDED.quantity,
                updated_at = NOW()
            ",
        )
        .bind(user)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(&line.image_ref)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user: UserId, product_id: &ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM storefront.cart_item
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_all(&self, user: UserId) -> Result<(), RepositoryError> {
        self.delete_for_user(user).await.map(|_| ())
    }
}
