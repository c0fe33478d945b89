//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use cornershop_core::{Identity, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in shopper,
/// taken from the hosted auth service's verified user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Subject of the verified access token.
    pub id: UserId,
    /// Email on the auth record, when the provider has one.
    pub email: Option<String>,
}

impl CurrentUser {
    /// The cart identity for this user.
    #[must_use]
    pub const fn identity(&self) -> Identity {
        Identity::User(self.id)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized anonymous cart (the local cart slot).
    pub const CART: &str = "cart";

    /// Key for the identity the session's cart was last reconciled under.
    pub const CART_IDENTITY: &str = "cart_identity";
}
