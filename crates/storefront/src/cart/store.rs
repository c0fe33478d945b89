//! The per-session cart state container.

use std::future::Future;

use cornershop_core::{CartLine, CartSnapshot, Identity, ProductId, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::{LocalCartSlot, RemoteCartItems};
use crate::db::RepositoryError;

/// Cart lines for one shopper session.
///
/// Mutations update memory first. While anonymous the full snapshot is then
/// written to the local slot; while signed in the affected remote row is
/// written on a detached task. Nothing here returns an error: a broken
/// backend degrades to "use what is in memory".
pub struct CartStore<R, L> {
    lines: CartSnapshot,
    identity: Identity,
    loading: bool,
    remote: R,
    local: L,
    pending: Vec<JoinHandle<()>>,
}

impl<R, L> CartStore<R, L>
where
    R: RemoteCartItems,
    L: LocalCartSlot,
{
    /// Open a cart for `identity`, hydrating it from wherever that identity
    /// keeps its lines.
    ///
    /// Anonymous carts come from the local slot. Signed-in carts come from
    /// the remote collection, falling back to the local slot if the fetch
    /// fails.
    pub async fn open(identity: Identity, remote: R, local: L) -> Self {
        let lines = match identity.user() {
            None => read_local(&local).await,
            Some(user) => match remote.fetch_all(user).await {
                Ok(lines) => CartSnapshot::from_lines(lines),
                Err(e) => {
                    warn!(%user, error = %e, "Failed to load remote cart, using local copy");
                    read_local(&local).await
                }
            },
        };

        Self::resume(identity, lines, remote, local)
    }

    /// Reopen a cart from lines already held in memory, without any I/O.
    #[must_use]
    pub const fn resume(identity: Identity, lines: CartSnapshot, remote: R, local: L) -> Self {
        Self {
            lines,
            identity,
            loading: false,
            remote,
            local,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub const fn lines(&self) -> &CartSnapshot {
        &self.lines
    }

    #[must_use]
    pub const fn identity(&self) -> Identity {
        self.identity
    }

    /// Whether an identity transition was started but never finished.
    ///
    /// [`set_identity`](Self::set_identity) holds `&mut self`, so this is
    /// only observable after its future was dropped part-way (a timeout, a
    /// cancelled request). The lines and identity are then still the previous
    /// ones, and calling `set_identity` again retries the transition.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.lines.total_item_count()
    }

    #[must_use]
    pub fn total_price(&self) -> rust_decimal::Decimal {
        self.lines.total_price()
    }

    /// React to the shopper signing in or out.
    ///
    /// Setting the identity the cart already has is a no-op, unless an
    /// earlier transition was interrupted.
    #[instrument(skip(self))]
    pub async fn set_identity(&mut self, identity: Identity) {
        if identity == self.identity && !self.loading {
            return;
        }

        self.loading = true;
        let lines = match identity {
            Identity::Anonymous => read_local(&self.local).await,
            Identity::User(user) => self.reconcile(user).await,
        };
        self.identity = identity;
        self.lines = lines;
        self.loading = false;

        debug!(
            lines = self.lines.len(),
            items = self.lines.total_item_count(),
            "Cart reconciled"
        );
    }

    /// Decide which lines a freshly signed-in user ends up with.
    async fn reconcile(&self, user: UserId) -> CartSnapshot {
        let local = read_local(&self.local).await;

        let remote = match self.remote.fetch_all(user).await {
            Ok(lines) => CartSnapshot::from_lines(lines),
            Err(e) => {
                warn!(%user, error = %e, "Failed to fetch remote cart, keeping local cart");
                return local;
            }
        };

        if !remote.is_empty() {
            debug!(%user, discarded = local.len(), "Adopting remote cart");
            self.delete_local().await;
            return remote;
        }

        if local.is_empty() {
            return CartSnapshot::new();
        }

        let mut pushed = Vec::with_capacity(local.len());
        for line in local.lines() {
            if let Err(e) = self.remote.upsert(user, line).await {
                warn!(
                    %user,
                    product_id = %line.product_id,
                    error = %e,
                    "Failed to push local cart, keeping local cart"
                );
                self.roll_back_push(user, &pushed).await;
                return local;
            }
            pushed.push(&line.product_id);
        }

        debug!(%user, lines = local.len(), "Pushed local cart to remote");
        self.delete_local().await;
        local
    }

    /// Remove rows written by a login push that failed part-way. The remote
    /// cart must be empty again for the next sign-in to push the whole cart.
    async fn roll_back_push(&self, user: UserId, pushed: &[&ProductId]) {
        for product_id in pushed {
            if let Err(e) = self.remote.delete(user, product_id).await {
                warn!(%user, %product_id, error = %e, "Failed to roll back partial cart push");
            }
        }
    }

    /// Add `line.quantity` units of a product, merging with an existing line.
    ///
    /// A zero quantity changes nothing.
    pub async fn add_line(&mut self, line: CartLine) {
        let quantity = line.quantity;
        let Some(updated) = self.lines.add(line, quantity).cloned() else {
            return;
        };
        self.persist_line(updated).await;
    }

    /// Remove a product's line. Removing a product that is not in the cart
    /// does nothing.
    pub async fn remove_line(&mut self, product_id: &ProductId) {
        if self.lines.remove(product_id).is_none() {
            return;
        }

        match self.identity.user() {
            Some(user) => {
                let remote = self.remote.clone();
                let product_id = product_id.clone();
                self.spawn_sync("delete", async move { remote.delete(user, &product_id).await });
            }
            None => self.write_local().await,
        }
    }

    /// Set a product's quantity. Zero or less removes the line; products not
    /// in the cart are ignored.
    pub async fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_line(product_id).await;
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(updated) = self.lines.set_quantity(product_id, quantity).cloned() {
            self.persist_line(updated).await;
        }
    }

    /// Empty the cart, dropping both the remote rows and the local slot.
    pub async fn clear(&mut self) {
        self.lines.clear();

        if let Some(user) = self.identity.user() {
            let remote = self.remote.clone();
            self.spawn_sync("delete_all", async move { remote.delete_all(user).await });
        }
        self.delete_local().await;
    }

    /// Wait for every background write started by this store.
    pub async fn settle(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cart sync task did not complete");
            }
        }
    }

    async fn persist_line(&mut self, line: CartLine) {
        match self.identity.user() {
            Some(user) => {
                let remote = self.remote.clone();
                self.spawn_sync("upsert", async move { remote.upsert(user, &line).await });
            }
            None => self.write_local().await,
        }
    }

    /// Fire-and-forget a remote write. Errors are logged, never returned.
    fn spawn_sync<F>(&mut self, op: &'static str, fut: F)
    where
        F: Future<Output = Result<(), RepositoryError>> + Send + 'static,
    {
        self.pending.retain(|h| !h.is_finished());

        let identity = self.identity;
        self.pending.push(tokio::spawn(async move {
            if let Err(e) = fut.await {
                warn!(op, ?identity, error = %e, "Remote cart sync failed");
            }
        }));
    }

    async fn write_local(&self) {
        let raw = match self.lines.to_json() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to encode cart");
                return;
            }
        };

        if let Err(e) = self.local.set(raw).await {
            warn!(error = %e, "Failed to persist cart locally");
        }
    }

    async fn delete_local(&self) {
        if let Err(e) = self.local.delete().await {
            warn!(error = %e, "Failed to delete local cart");
        }
    }
}

/// Read the local slot, treating missing or unreadable data as an empty cart.
async fn read_local<L: LocalCartSlot>(local: &L) -> CartSnapshot {
    match local.get().await {
        Ok(Some(raw)) => CartSnapshot::from_json(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable local cart");
            CartSnapshot::new()
        }),
        Ok(None) => CartSnapshot::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read local cart");
            CartSnapshot::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::cart::memory::{MemoryCartItems, MemoryCartSlot};

    /// A remote whose reads never complete.
    #[derive(Clone)]
    struct StalledRemote;

    impl RemoteCartItems for StalledRemote {
        async fn fetch_all(&self, _user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
            std::future::pending().await
        }

        async fn upsert(&self, _user: UserId, _line: &CartLine) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete(&self, _user: UserId, _id: &ProductId) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete_all(&self, _user: UserId) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine::new(id, format!("Product {id}"), Decimal::new(1250, 2), "").with_quantity(quantity)
    }

    fn user() -> UserId {
        UserId::new(uuid::Uuid::new_v4())
    }

    async fn anonymous() -> CartStore<MemoryCartItems, MemoryCartSlot> {
        CartStore::open(
            Identity::Anonymous,
            MemoryCartItems::default(),
            MemoryCartSlot::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_anonymous_add_persists_locally() {
        let slot = MemoryCartSlot::default();
        let mut cart =
            CartStore::open(Identity::Anonymous, MemoryCartItems::default(), slot.clone()).await;

        cart.add_line(line("a", 2)).await;
        cart.add_line(line("a", 1)).await;

        let stored = CartSnapshot::from_json(&slot.peek().unwrap()).unwrap();
        assert_eq!(stored.get(&ProductId::new("a")).unwrap().quantity, 3);
        assert_eq!(cart.total_item_count(), 3);
        assert_eq!(cart.total_price(), Decimal::new(3750, 2));
    }

    #[tokio::test]
    async fn test_add_zero_quantity_is_noop() {
        let mut cart = anonymous().await;
        cart.add_line(line("a", 0)).await;
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_negative_removes() {
        let mut cart = anonymous().await;
        cart.add_line(line("a", 2)).await;
        cart.set_quantity(&ProductId::new("a"), -3).await;
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_identified_add_upserts_remote() {
        let remote = MemoryCartItems::default();
        let slot = MemoryCartSlot::default();
        let id = user();
        let mut cart = CartStore::open(Identity::User(id), remote.clone(), slot.clone()).await;

        cart.add_line(line("a", 1)).await;
        cart.add_line(line("a", 4)).await;
        cart.settle().await;

        assert_eq!(remote.lines_for(id), vec![line("a", 5)]);
        assert!(slot.peek().is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_memory_state() {
        let remote = MemoryCartItems::default();
        let id = user();
        let mut cart =
            CartStore::open(Identity::User(id), remote.clone(), MemoryCartSlot::default()).await;

        remote.set_offline(true);
        cart.add_line(line("a", 2)).await;
        cart.settle().await;

        assert_eq!(cart.lines().get(&ProductId::new("a")).unwrap().quantity, 2);
        remote.set_offline(false);
        assert!(remote.lines_for(id).is_empty());
    }

    #[tokio::test]
    async fn test_logout_reloads_local_slot() {
        let slot = MemoryCartSlot::default();
        slot.put(CartSnapshot::from_lines([line("x", 1)]).to_json().unwrap());
        let id = user();
        let mut cart = CartStore::resume(
            Identity::User(id),
            CartSnapshot::from_lines([line("b", 3)]),
            MemoryCartItems::default(),
            slot,
        );

        cart.set_identity(Identity::Anonymous).await;

        assert_eq!(cart.lines().lines(), &[line("x", 1)]);
        assert!(!cart.is_loading());
    }

    #[tokio::test]
    async fn test_set_same_identity_is_noop() {
        let remote = MemoryCartItems::default();
        let id = user();
        remote.seed(id, vec![line("b", 3)]);
        let mut cart = CartStore::resume(
            Identity::User(id),
            CartSnapshot::from_lines([line("a", 1)]),
            remote,
            MemoryCartSlot::default(),
        );

        cart.set_identity(Identity::User(id)).await;

        assert_eq!(cart.lines().lines(), &[line("a", 1)]);
    }

    #[tokio::test]
    async fn test_corrupt_local_slot_reads_as_empty() {
        let slot = MemoryCartSlot::default();
        slot.put("definitely not json".to_owned());
        let cart = CartStore::open(Identity::Anonymous, MemoryCartItems::default(), slot).await;
        assert!(cart.lines().is_empty());
    }

    #[tokio::test]
    async fn test_interrupted_sign_in_keeps_previous_state_and_retries() {
        let slot = MemoryCartSlot::default();
        let mut cart = CartStore::open(Identity::Anonymous, StalledRemote, slot.clone()).await;
        cart.add_line(line("a", 2)).await;
        let id = user();

        let attempt = tokio::time::timeout(
            Duration::from_millis(20),
            cart.set_identity(Identity::User(id)),
        )
        .await;

        assert!(attempt.is_err());
        assert!(cart.is_loading());
        assert_eq!(cart.identity(), Identity::Anonymous);
        assert_eq!(cart.lines().lines(), &[line("a", 2)]);
        assert!(slot.peek().is_some());

        cart.set_identity(Identity::Anonymous).await;
        assert!(!cart.is_loading());
        assert_eq!(cart.lines().lines(), &[line("a", 2)]);
    }

    #[tokio::test]
    async fn test_partial_login_push_is_rolled_back() {
        let remote = MemoryCartItems::default();
        let slot = MemoryCartSlot::default();
        let mut cart = CartStore::open(Identity::Anonymous, remote.clone(), slot.clone()).await;
        cart.add_line(line("a", 1)).await;
        cart.add_line(line("b", 2)).await;
        let id = user();

        remote.limit_upserts(Some(1));
        cart.set_identity(Identity::User(id)).await;

        assert_eq!(cart.lines().len(), 2);
        assert!(remote.lines_for(id).is_empty());
        assert!(slot.peek().is_some());
    }
}
