//! Session-backed user extractor.
//!
//! Authentication itself is delegated to the hosted auth service (see
//! [`crate::services::auth`]); after a successful sign-in the verified user is
//! stored in the session and read back here on every request.

use axum::{extract::FromRequestParts, http::request::Parts};
use cornershop_core::Identity;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that optionally gets the signed-in user.
///
/// Never rejects; a request without a session or without a signed-in user
/// yields `None`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Signed in as {}", u.id),
///         None => "Browsing anonymously".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub Option<CurrentUser>);

impl OptionalAuth {
    /// The cart identity for this request.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.0
            .as_ref()
            .map_or(Identity::Anonymous, CurrentUser::identity)
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session.
///
/// # Returns
///
/// The user that was signed in, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use cornershop_core::UserId;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_set_and_clear_current_user() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let user = CurrentUser {
            id: UserId::new(uuid::Uuid::new_v4()),
            email: Some("shopper@example.com".to_owned()),
        };

        set_current_user(&session, &user).await.unwrap();
        let stored: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await.unwrap();
        assert_eq!(stored.map(|u| u.id), Some(user.id));

        let removed = clear_current_user(&session).await.unwrap();
        assert_eq!(removed.map(|u| u.id), Some(user.id));
        assert!(clear_current_user(&session).await.unwrap().is_none());
    }

    #[test]
    fn test_identity_defaults_to_anonymous() {
        assert_eq!(OptionalAuth(None).identity(), Identity::Anonymous);
    }
}
