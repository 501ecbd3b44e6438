use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CartLine, SkuId, MAX_LINE_QUANTITY};
use crate::error::CartError;

/// Ordered list of cart lines, at most one per SKU.
///
/// Quantities stay within `1..=MAX_LINE_QUANTITY` while a line exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines {
    lines: Vec<CartLine>,
}

impl CartLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `line`, summing into an existing line for the same SKU.
    ///
    /// # Errors
    /// Rejects a zero quantity or a negative unit price. Quantities over the
    /// cap are clamped, not rejected.
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity(line.quantity));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(CartError::NegativePrice(line.sku));
        }

        self.fold_in(line);
        Ok(())
    }

    /// Same summation and cap as [`CartLines::add`], for lines that already
    /// passed validation.
    pub(crate) fn fold_in(&mut self, line: CartLine) {
        match self.position(&line.sku) {
            Some(i) => {
                let existing = &mut self.lines[i];
                existing.quantity = existing
                    .quantity
                    .saturating_add(line.quantity)
                    .min(MAX_LINE_QUANTITY);
            }
            None => {
                let quantity = line.quantity.min(MAX_LINE_QUANTITY);
                self.lines.push(CartLine { quantity, ..line });
            }
        }
    }

    /// Moves the quantity of `sku` by `delta`, clamped to `0..=MAX_LINE_QUANTITY`.
    /// Reaching zero removes the line; an unknown SKU is ignored.
    pub fn update_quantity(&mut self, sku: &SkuId, delta: i64) {
        let Some(i) = self.position(sku) else {
            return;
        };

        let updated =
            (i64::from(self.lines[i].quantity) + delta).clamp(0, i64::from(MAX_LINE_QUANTITY));
        if updated == 0 {
            self.lines.remove(i);
        } else {
            // clamp above keeps this within u32
            self.lines[i].quantity = updated as u32;
        }
    }

    /// Sets the quantity of `sku` outright, as a quantity selector would.
    ///
    /// # Errors
    /// A quantity above the cap is rejected and nothing changes.
    pub fn set_quantity(&mut self, sku: &SkuId, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityAboveCap {
                sku: sku.clone(),
                requested: quantity,
                cap: MAX_LINE_QUANTITY,
            });
        }

        if let Some(i) = self.position(sku) {
            if quantity == 0 {
                self.lines.remove(i);
            } else {
                self.lines[i].quantity = quantity;
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, sku: &SkuId) {
        self.lines.retain(|line| &line.sku != sku);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Empties the list and hands back what it held.
    pub fn take(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }

    pub fn items(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn get(&self, sku: &SkuId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.sku == sku)
    }

    pub fn quantity_of(&self, sku: &SkuId) -> u32 {
        self.get(sku).map_or(0, |line| line.quantity)
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total units across all lines.
    pub fn count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn position(&self, sku: &SkuId) -> Option<usize> {
        self.lines.iter().position(|line| &line.sku == sku)
    }
}

impl From<Vec<CartLine>> for CartLines {
    /// Rebuilds a list from stored lines, re-applying the SKU merge and cap.
    fn from(lines: Vec<CartLine>) -> Self {
        let mut list = Self::new();
        for line in lines.into_iter().filter(|line| line.quantity > 0) {
            list.fold_in(line);
        }
        list
    }
}
