//! Access token verification against the hosted auth service.
//!
//! Tokens are issued to the browser by the hosted auth service. The
//! storefront never sees passwords; it asks the service who a token belongs
//! to and stores the answer in the session.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use cornershop_core::UserId;

use crate::config::AuthConfig;
use crate::models::CurrentUser;

/// User record returned by the auth service.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: UserId,
    email: Option<String>,
}

/// Client for the hosted auth service.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    user_endpoint: String,
    anon_key: String,
}

impl AuthClient {
    /// Create a new auth client.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                user_endpoint: format!("{}/auth/v1/user", config.url),
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        }
    }

    /// Resolve an access token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the service rejects the token,
    /// `AuthError::Http` if the service cannot be reached, and
    /// `AuthError::Unexpected` for any other response.
    #[instrument(skip_all)]
    pub async fn verify(&self, access_token: &str) -> Result<CurrentUser, AuthError> {
        let response = self
            .inner
            .client
            .get(&self.inner.user_endpoint)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::InvalidToken);
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Auth service returned non-success status"
            );
            return Err(AuthError::Unexpected(format!("HTTP {status}")));
        }

        parse_user(&body)
    }
}

fn parse_user(body: &str) -> Result<CurrentUser, AuthError> {
    let user: AuthUser = serde_json::from_str(body)
        .map_err(|e| AuthError::Unexpected(format!("malformed user record: {e}")))?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user() {
        let body = r#"{
            "id": "8d3c0f3e-6a47-4d0e-9a52-1f9c7b2e4d10",
            "email": "shopper@cornershop.test",
            "role": "authenticated",
            "aud": "authenticated"
        }"#;

        let user = parse_user(body).unwrap();
        assert_eq!(
            user.id.to_string(),
            "8d3c0f3e-6a47-4d0e-9a52-1f9c7b2e4d10"
        );
        assert_eq!(user.email.as_deref(), Some("shopper@cornershop.test"));
    }

    #[test]
    fn test_parse_user_without_email() {
        let user = parse_user(r#"{"id":"8d3c0f3e-6a47-4d0e-9a52-1f9c7b2e4d10"}"#).unwrap();
        assert!(user.email.is_none());
    }

    #[test]
    fn test_parse_user_rejects_bad_id() {
        assert!(matches!(
            parse_user(r#"{"id":"42"}"#),
            Err(AuthError::Unexpected(_))
        ));
    }
}
