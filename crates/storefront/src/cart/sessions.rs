//! Opening carts per request and tracking identity changes.

use std::time::Duration;

use cornershop_core::{CartSnapshot, Identity, UserId};
use moka::future::Cache;
use tower_sessions::Session;
use tracing::{debug, warn};

use super::{CartStore, LocalCartSlot, RemoteCartItems, SessionCartSlot};
use crate::models::session_keys;

/// Hands out a [`CartStore`] for each request.
///
/// The session records which identity its cart was last reconciled under.
/// When the request's identity differs, the store is moved to the new
/// identity before it is returned. Signed-in carts are kept in a bounded
/// in-process cache so that a request sees the previous request's optimistic
/// state even if the background write has not landed yet.
#[derive(Clone)]
pub struct CartSessions<R> {
    remote: R,
    working: Cache<UserId, CartSnapshot>,
}

impl<R: RemoteCartItems> CartSessions<R> {
    /// Create a cart registry.
    ///
    /// # Arguments
    ///
    /// * `remote` - Per-user cart collection
    /// * `capacity` - Maximum number of signed-in carts kept in memory
    /// * `idle` - How long an untouched signed-in cart stays cached
    #[must_use]
    pub fn new(remote: R, capacity: u64, idle: Duration) -> Self {
        let working = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle)
            .build();

        Self { remote, working }
    }

    /// The remote collection carts are synced to.
    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Open the cart for `session`, reconciling it if `identity` changed.
    pub async fn open(
        &self,
        session: &Session,
        identity: Identity,
    ) -> CartStore<R, SessionCartSlot> {
        let slot = SessionCartSlot::new(session.clone());
        let seen: Identity = session
            .get(session_keys::CART_IDENTITY)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let cached = match seen.user() {
            Some(user) => self.working.get(&user).await,
            None => None,
        };
        let mut store = match cached {
            Some(lines) => CartStore::resume(seen, lines, self.remote.clone(), slot),
            None if seen == identity => CartStore::open(seen, self.remote.clone(), slot).await,
            // About to transition: reconciliation decides the lines, so skip
            // hydrating the outgoing identity.
            None => CartStore::resume(seen, CartSnapshot::new(), self.remote.clone(), slot),
        };

        if seen != identity {
            debug!(from = ?seen, to = ?identity, "Session identity changed");
            store.set_identity(identity).await;

            if let Err(e) = session
                .insert(session_keys::CART_IDENTITY, identity)
                .await
            {
                warn!(error = %e, "Failed to record cart identity in session");
            }
        }

        self.retain(&store).await;
        store
    }

    /// Remember a signed-in store's lines for the next request.
    pub async fn retain<L: LocalCartSlot>(&self, store: &CartStore<R, L>) {
        if let Some(user) = store.identity().user() {
            self.working.insert(user, store.lines().clone()).await;
        }
    }

    /// Drop a user's cached cart so the next request reads the remote rows.
    pub async fn forget(&self, user: UserId) {
        self.working.invalidate(&user).await;
    }
}
