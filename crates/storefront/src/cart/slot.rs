//! Session-backed local cart slot.

use tower_sessions::Session;

use super::{LocalCartSlot, SlotError};
use crate::models::session_keys;

/// Stores the serialized anonymous cart under a single session key.
#[derive(Clone)]
pub struct SessionCartSlot {
    session: Session,
}

impl SessionCartSlot {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl LocalCartSlot for SessionCartSlot {
    async fn get(&self) -> Result<Option<String>, SlotError> {
        Ok(self.session.get::<String>(session_keys::CART).await?)
    }

    async fn set(&self, value: String) -> Result<(), SlotError> {
        self.session.insert(session_keys::CART, value).await?;
        Ok(())
    }

    async fn delete(&self) -> Result<(), SlotError> {
        self.session.remove::<String>(session_keys::CART).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use cornershop_core::{CartLine, CartSnapshot};
    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use super::*;

    fn slot() -> SessionCartSlot {
        SessionCartSlot::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_round_trips_snapshot() {
        let slot = slot();
        let cart = CartSnapshot::from_lines([
            CartLine::new("mug", "Mug", Decimal::new(1400, 2), "/img/mug.webp").with_quantity(2),
        ]);

        slot.set(cart.to_json().unwrap()).await.unwrap();
        let raw = slot.get().await.unwrap().unwrap();

        assert_eq!(CartSnapshot::from_json(&raw).unwrap(), cart);
    }

    #[tokio::test]
    async fn test_delete_empties_slot() {
        let slot = slot();
        slot.set("[]".to_owned()).await.unwrap();
        slot.delete().await.unwrap();
        assert!(slot.get().await.unwrap().is_none());
    }
}
