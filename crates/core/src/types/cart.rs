//! Cart line items and the snapshot that holds them.
//!
//! [`CartSnapshot`] is pure data: it enforces the one-line-per-product
//! invariant and computes totals, but knows nothing about where it is stored.
//! Its serialized form is a bare JSON array of [`CartLine`] records with no
//! version marker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CurrencyCode, Price, ProductId};

/// Error decoding a persisted snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed cart snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One product's presence in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Price of a single unit. Never negative.
    pub unit_price: Decimal,
    pub image_ref: String,
    /// Always at least 1 while the line is in a snapshot.
    pub quantity: u32,
}

impl CartLine {
    /// A single unit of a product.
    #[must_use]
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Decimal,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            image_ref: image_ref.into(),
            quantity: 1,
        }
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// `unit_price * quantity`, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Ordered collection of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a snapshot from arbitrary lines.
    ///
    /// Zero-quantity lines are dropped and repeated products are folded into
    /// the first occurrence, so the result always satisfies the invariants.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut snapshot = Self::new();
        for line in lines {
            let quantity = line.quantity;
            snapshot.add(line, quantity);
        }
        snapshot
    }

    /// Decode the local persistence format.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Malformed` if `raw` is not a JSON array of lines.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let lines: Vec<CartLine> = serde_json::from_str(raw)?;
        Ok(Self::from_lines(lines))
    }

    /// Encode to the local persistence format.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Malformed` if serialization fails, which only
    /// happens if a serializer invariant is broken.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.lines)?)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Add `quantity` units of `line.product_id`.
    ///
    /// If the product is already present its quantity grows by `quantity`
    /// (saturating); otherwise `line` is appended with that quantity. Returns
    /// the resulting line, or `None` when `quantity` is zero.
    pub fn add(&mut self, line: CartLine, quantity: u32) -> Option<&CartLine> {
        if quantity == 0 {
            return None;
        }

        match self
            .lines
            .iter()
            .position(|l| l.product_id == line.product_id)
        {
            Some(idx) => {
                let existing = self.lines.get_mut(idx)?;
                existing.quantity = existing.quantity.saturating_add(quantity);
                Some(&*existing)
            }
            None => {
                self.lines.push(CartLine { quantity, ..line });
                self.lines.last()
            }
        }
    }

    /// Remove a product's line. Returns the removed line, if there was one.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let idx = self
            .lines
            .iter()
            .position(|l| &l.product_id == product_id)?;
        Some(self.lines.remove(idx))
    }

    /// Set a product's quantity to an absolute value.
    ///
    /// Zero removes the line. A product that is not in the cart is left
    /// alone and `None` is returned.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Option<&CartLine> {
        if quantity == 0 {
            self.remove(product_id);
            return None;
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| &l.product_id == product_id)?;
        line.quantity = quantity;
        Some(&*line)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `unit_price * quantity` over all lines, saturating at
    /// `Decimal::MAX`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Total price tagged with a currency, for display.
    #[must_use]
    pub fn subtotal(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.total_price(), currency_code)
    }
}

impl IntoIterator for CartSnapshot {
    type Item = CartLine;
    type IntoIter = std::vec::IntoIter<CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Decimal::new(cents, 2),
            image_ref: format!("/images/{id}.webp"),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = CartSnapshot::new();
        cart.add(line("a", 500, 1), 2);
        cart.add(line("a", 500, 1), 3);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = CartSnapshot::new();
        assert!(cart.add(line("a", 500, 1), 0).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_saturates() {
        let mut cart = CartSnapshot::new();
        cart.add(line("a", 100, 1), u32::MAX);
        cart.add(line("a", 100, 1), 10);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, u32::MAX);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = CartSnapshot::new();
        cart.add(line("b", 100, 1), 1);
        cart.add(line("a", 100, 1), 1);
        cart.add(line("b", 100, 1), 1);

        let ids: Vec<_> = cart.lines().iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_remove_twice_same_as_once() {
        let mut cart = CartSnapshot::from_lines([line("a", 100, 1), line("b", 100, 2)]);
        let id = ProductId::new("a");

        assert!(cart.remove(&id).is_some());
        let after_once = cart.clone();
        assert!(cart.remove(&id).is_none());
        assert_eq!(cart, after_once);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = CartSnapshot::from_lines([line("a", 100, 4)]);
        assert!(cart.set_quantity(&ProductId::new("a"), 0).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_product_is_noop() {
        let mut cart = CartSnapshot::from_lines([line("a", 100, 4)]);
        let before = cart.clone();
        assert!(cart.set_quantity(&ProductId::new("zzz"), 3).is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity_is_absolute() {
        let mut cart = CartSnapshot::from_lines([line("a", 100, 4)]);
        cart.set_quantity(&ProductId::new("a"), 2);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, 2);
    }

    #[test]
    fn test_totals() {
        let empty = CartSnapshot::new();
        assert_eq!(empty.total_item_count(), 0);
        assert_eq!(empty.total_price(), Decimal::ZERO);

        let cart = CartSnapshot::from_lines([line("a", 1999, 2), line("b", 250, 3)]);
        assert_eq!(cart.total_item_count(), 5);
        assert_eq!(cart.total_price(), Decimal::new(4748, 2));
        assert_eq!(cart.subtotal(CurrencyCode::USD).display(), "$47.48");
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let huge = CartLine {
            unit_price: Decimal::MAX,
            ..line("a", 0, 2)
        };
        assert_eq!(huge.line_total(), Decimal::MAX);

        let cart = CartSnapshot::from_lines([huge, line("b", 100, 1)]);
        assert_eq!(cart.total_price(), Decimal::MAX);
        assert_eq!(cart.total_item_count(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        let cart = CartSnapshot::from_lines([line("a", 1999, 2), line("b", 5, 7)]);
        let raw = cart.to_json().unwrap();

        assert!(raw.starts_with('['));
        assert_eq!(CartSnapshot::from_json(&raw).unwrap(), cart);
    }

    #[test]
    fn test_from_json_enforces_invariants() {
        let raw = r#"[
            {"product_id":"a","name":"A","unit_price":"1.00","image_ref":"","quantity":1},
            {"product_id":"b","name":"B","unit_price":"2.00","image_ref":"","quantity":0},
            {"product_id":"a","name":"A","unit_price":"1.00","image_ref":"","quantity":2}
        ]"#;

        let cart = CartSnapshot::from_json(raw).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&ProductId::new("a")).unwrap().quantity, 3);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            CartSnapshot::from_json("{\"not\":\"an array\"}"),
            Err(SnapshotError::Malformed(_))
        ));
    }
}
