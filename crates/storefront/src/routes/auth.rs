//! Sign-in and sign-out handlers.
//!
//! Credentials never reach this service. The client signs in with the hosted
//! auth service and hands us its access token; we verify it, remember the user
//! in the session and reconcile the cart under the new identity.

use std::fmt;

use axum::{Form, Json, extract::State};
use cornershop_core::Identity;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::cart::CartView;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::state::AppState;

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    pub access_token: String,
}

impl fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInForm")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Verify an access token and sign the session in.
///
/// Responds with the reconciled cart: the user's saved cart if they had one,
/// otherwise the anonymous cart they built before signing in.
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Result<Json<CartView>> {
    let token = form.access_token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest(
            "access_token must not be empty".to_string(),
        ));
    }

    let user = state.auth().verify(token).await?;

    // New privilege level, new session ID.
    session.cycle_id().await?;
    set_current_user(&session, &user).await?;

    set_sentry_user(&user.id, user.email.as_deref());
    add_breadcrumb("auth", "Signed in", None);
    info!(user_id = %user.id, "User signed in");

    let cart = state.carts().open(&session, user.identity()).await;
    Ok(Json(CartView::of(&cart, state.config().cart.currency)))
}

/// Sign the session out.
///
/// The cart falls back to whatever the session's anonymous slot holds; the
/// signed-in cart stays in the database for the next sign-in.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let previous = clear_current_user(&session).await?;

    if let Err(e) = session.cycle_id().await {
        warn!(error = %e, "Failed to cycle session ID on logout");
    }

    clear_sentry_user();
    add_breadcrumb("auth", "Signed out", None);

    let cart = state.carts().open(&session, Identity::Anonymous).await;

    if let Some(user) = previous {
        state.carts().forget(user.id).await;
        info!(user_id = %user.id, "User signed out");
    }

    Ok(Json(CartView::of(&cart, state.config().cart.currency)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_form_debug_redacts_token() {
        let form = SignInForm {
            access_token: "eyJhbGciOiJIUzI1NiJ9.secret".to_owned(),
        };
        let debug = format!("{form:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }
}
