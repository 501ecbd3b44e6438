use rust_decimal::Decimal;
use tracing::{debug, info};

use super::CartLines;
use crate::domain::{CartLine, SkuId};
use crate::error::CartError;

/// The shopper's authenticated cart and the pending cart collected before login.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartStore {
    active: CartLines,
    pending: CartLines,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(active: CartLines, pending: CartLines) -> Self {
        Self { active, pending }
    }

    pub fn add_item(&mut self, line: CartLine) -> Result<(), CartError> {
        debug!(sku = %line.sku, quantity = line.quantity, "Adding item to cart");
        self.active.add(line)
    }

    pub fn update_quantity(&mut self, sku: &SkuId, delta: i64) {
        self.active.update_quantity(sku, delta);
    }

    pub fn set_quantity(&mut self, sku: &SkuId, quantity: u32) -> Result<(), CartError> {
        self.active.set_quantity(sku, quantity)
    }

    pub fn remove_item(&mut self, sku: &SkuId) {
        self.active.remove(sku);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn add_to_pending(&mut self, line: CartLine) -> Result<(), CartError> {
        debug!(sku = %line.sku, quantity = line.quantity, "Adding item to pending cart");
        self.pending.add(line)
    }

    pub fn update_pending_quantity(&mut self, sku: &SkuId, delta: i64) {
        self.pending.update_quantity(sku, delta);
    }

    pub fn set_pending_quantity(&mut self, sku: &SkuId, quantity: u32) -> Result<(), CartError> {
        self.pending.set_quantity(sku, quantity)
    }

    pub fn remove_from_pending(&mut self, sku: &SkuId) {
        self.pending.remove(sku);
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending_quantity_of(&self, sku: &SkuId) -> u32 {
        self.pending.quantity_of(sku)
    }

    /// Folds every pending line into the active cart (summing, capped) and
    /// empties the pending cart. Returns the number of lines merged; an empty
    /// pending cart merges nothing.
    pub fn merge_pending_into_cart(&mut self) -> usize {
        let pending = self.pending.take();
        let merged = pending.len();
        for line in pending {
            self.active.fold_in(line);
        }

        if merged > 0 {
            info!(merged, "Merged pending cart into cart");
        }
        merged
    }

    pub fn items(&self) -> &[CartLine] {
        self.active.items()
    }

    pub fn pending_items(&self) -> &[CartLine] {
        self.pending.items()
    }

    pub fn subtotal(&self) -> Decimal {
        self.active.subtotal()
    }

    pub fn count(&self) -> u32 {
        self.active.count()
    }

    pub fn quantity_of(&self, sku: &SkuId) -> u32 {
        self.active.quantity_of(sku)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active(&self) -> &CartLines {
        &self.active
    }

    pub fn pending(&self) -> &CartLines {
        &self.pending
    }
}
