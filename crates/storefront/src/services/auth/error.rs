//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while verifying a shopper's access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth service rejected the token (expired, revoked, malformed).
    #[error("invalid access token")]
    InvalidToken,

    /// HTTP request to the auth service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth service answered with something we do not understand.
    #[error("unexpected auth response: {0}")]
    Unexpected(String),
}
