//! In-process cart backends.
//!
//! Used by the test suites and for running the cart without a database. The
//! remote collection can be switched offline to exercise the degraded paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cornershop_core::{CartLine, ProductId, UserId};

use super::{LocalCartSlot, RemoteCartItems, SlotError};
use crate::db::RepositoryError;

/// Remote cart rows kept in a shared map.
#[derive(Clone, Default)]
pub struct MemoryCartItems {
    inner: Arc<Mutex<MemoryItems>>,
}

#[derive(Default)]
struct MemoryItems {
    rows: HashMap<UserId, Vec<CartLine>>,
    offline: bool,
    upsert_budget: Option<usize>,
}

impl MemoryCartItems {
    /// While offline every operation fails with `RepositoryError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Let the next `count` upserts succeed and fail every one after that.
    /// `None` lifts the limit.
    pub fn limit_upserts(&self, count: Option<usize>) {
        self.lock().upsert_budget = count;
    }

    /// Replace a user's rows.
    pub fn seed(&self, user: UserId, lines: Vec<CartLine>) {
        self.lock().rows.insert(user, lines);
    }

    /// Current rows for a user, ignoring the offline switch.
    #[must_use]
    pub fn lines_for(&self, user: UserId) -> Vec<CartLine> {
        self.lock().rows.get(&user).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryItems> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn online(&self) -> Result<std::sync::MutexGuard<'_, MemoryItems>, RepositoryError> {
        let guard = self.lock();
        if guard.offline {
            return Err(RepositoryError::Unavailable(
                "memory cart store is offline".to_owned(),
            ));
        }
        Ok(guard)
    }
}

impl RemoteCartItems for MemoryCartItems {
    async fn fetch_all(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self.online()?.rows.get(&user).cloned().unwrap_or_default())
    }

    async fn upsert(&self, user: UserId, line: &CartLine) -> Result<(), RepositoryError> {
        let mut guard = self.online()?;
        match guard.upsert_budget {
            Some(0) => {
                return Err(RepositoryError::Unavailable(
                    "memory cart store rejected the write".to_owned(),
                ));
            }
            Some(left) => guard.upsert_budget = Some(left - 1),
            None => {}
        }
        let rows = guard.rows.entry(user).or_default();
        match rows.iter_mut().find(|r| r.product_id == line.product_id) {
            Some(row) => row.clone_from(line),
            None => rows.push(line.clone()),
        }
        Ok(())
    }

    async fn delete(&self, user: UserId, product_id: &ProductId) -> Result<(), RepositoryError> {
        if let Some(rows) = self.online()?.rows.get_mut(&user) {
            rows.retain(|r| &r.product_id != product_id);
        }
        Ok(())
    }

    async fn delete_all(&self, user: UserId) -> Result<(), RepositoryError> {
        self.online()?.rows.remove(&user);
        Ok(())
    }
}

/// A local slot backed by a shared `Option<String>`.
#[derive(Clone, Default)]
pub struct MemoryCartSlot {
    value: Arc<Mutex<Option<String>>>,
}

impl MemoryCartSlot {
    /// The raw stored value.
    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Overwrite the raw stored value.
    pub fn put(&self, value: String) {
        *self.lock() = Some(value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalCartSlot for MemoryCartSlot {
    async fn get(&self) -> Result<Option<String>, SlotError> {
        Ok(self.peek())
    }

    async fn set(&self, value: String) -> Result<(), SlotError> {
        self.put(value);
        Ok(())
    }

    async fn delete(&self) -> Result<(), SlotError> {
        self.lock().take();
        Ok(())
    }
}
