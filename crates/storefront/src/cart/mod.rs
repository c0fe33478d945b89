//! Shopping cart state and its two persistence backends.
//!
//! # Architecture
//!
//! - [`CartStore`] owns the lines for one shopper session and applies every
//!   mutation to memory first
//! - While anonymous, the whole snapshot is written to a [`LocalCartSlot`]
//!   (the session) before the operation returns
//! - Once a user is signed in, each change is mirrored to the
//!   [`RemoteCartItems`] collection on a background task; failures are logged
//!   and never reach the caller
//! - [`CartSessions`] opens a store per request and notices when the
//!   session's identity changed since the cart was last reconciled
//!
//! # Identity transitions
//!
//! ```text
//! anonymous -> user      fetch remote
//!                        remote non-empty  => adopt remote, drop local slot
//!                        local non-empty   => push local to remote, drop local slot
//!                        any failure       => keep local slot contents
//! user -> anonymous      reload from local slot (no remote access)
//! ```

pub mod memory;
mod sessions;
mod slot;
mod store;

use std::future::Future;

use cornershop_core::{CartLine, ProductId, UserId};
use thiserror::Error;

use crate::db::RepositoryError;

pub use sessions::CartSessions;
pub use slot::SessionCartSlot;
pub use store::CartStore;

/// Per-user cart rows in the hosted database, keyed by `(user, product)`.
///
/// Implementations are cloned into background tasks, so they should be
/// cheap handles around shared state (a pool, an `Arc`).
pub trait RemoteCartItems: Clone + Send + Sync + 'static {
    /// All lines stored for `user`, in display order.
    fn fetch_all(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;

    /// Insert or overwrite the row for `(user, line.product_id)`.
    fn upsert(
        &self,
        user: UserId,
        line: &CartLine,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete the row for `(user, product_id)`. Missing rows are not an error.
    fn delete(
        &self,
        user: UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every row belonging to `user`.
    fn delete_all(&self, user: UserId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A single string value holding the serialized anonymous cart.
pub trait LocalCartSlot: Send + Sync {
    fn get(&self) -> impl Future<Output = Result<Option<String>, SlotError>> + Send;

    fn set(&self, value: String) -> impl Future<Output = Result<(), SlotError>> + Send;

    fn delete(&self) -> impl Future<Output = Result<(), SlotError>> + Send;
}

/// Error reading or writing the local slot.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
