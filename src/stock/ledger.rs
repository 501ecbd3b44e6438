use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::domain::{SkuId, StockLine};
use crate::error::StockError;

/// Units assumed on hand for a SKU the ledger has never seen.
pub const DEFAULT_STOCK_SEED: u32 = 10;

/// Saturating per-SKU stock counters.
///
/// Counters never go below zero. A SKU that has never been recorded reads as
/// `seed` units until its first deduction or explicit override.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLedger {
    on_hand: HashMap<SkuId, u32>,
    seed: u32,
}

impl Default for StockLedger {
    fn default() -> Self {
        Self::new(DEFAULT_STOCK_SEED)
    }
}

impl StockLedger {
    pub fn new(seed: u32) -> Self {
        Self {
            on_hand: HashMap::new(),
            seed,
        }
    }

    pub fn from_records(seed: u32, records: impl IntoIterator<Item = (SkuId, u32)>) -> Self {
        Self {
            on_hand: records.into_iter().collect(),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn on_hand(&self, sku: &SkuId) -> u32 {
        self.on_hand.get(sku).copied().unwrap_or(self.seed)
    }

    /// Units still purchasable once the shopper's own cart quantity is set aside.
    pub fn available_for_purchase(&self, sku: &SkuId, quantity_in_cart: u32) -> u32 {
        self.on_hand(sku).saturating_sub(quantity_in_cart)
    }

    pub fn set_on_hand(&mut self, sku: SkuId, quantity: u32) {
        self.on_hand.insert(sku, quantity);
    }

    /// Subtracts each line's quantity, clamping at zero.
    pub fn deduct(&mut self, lines: &[StockLine]) {
        for line in lines {
            let seed = self.seed;
            let counter = self.on_hand.entry(line.sku.clone()).or_insert(seed);
            if *counter < line.quantity {
                warn!(sku = %line.sku, on_hand = *counter, requested = line.quantity, "Stock deduction clamped at zero");
            }
            *counter = counter.saturating_sub(line.quantity);
            debug!(sku = %line.sku, remaining = *counter, "Stock deducted");
        }
    }

    /// Re-checks every SKU against what is on hand and deducts only if all of
    /// them can be covered.
    ///
    /// # Errors
    /// Returns [`StockError::Unavailable`] for the first short SKU; the ledger
    /// is left untouched.
    pub fn try_deduct(&mut self, lines: &[StockLine]) -> Result<(), StockError> {
        let mut requested: BTreeMap<&SkuId, u32> = BTreeMap::new();
        for line in lines {
            let total = requested.entry(&line.sku).or_insert(0);
            *total = total.saturating_add(line.quantity);
        }

        for (sku, requested) in requested {
            let available = self.on_hand(sku);
            if available < requested {
                return Err(StockError::Unavailable {
                    sku: sku.clone(),
                    requested,
                    available,
                });
            }
        }

        self.deduct(lines);
        Ok(())
    }

    pub fn restore(&mut self, lines: &[StockLine]) {
        for line in lines {
            let seed = self.seed;
            let counter = self.on_hand.entry(line.sku.clone()).or_insert(seed);
            *counter = counter.saturating_add(line.quantity);
            debug!(sku = %line.sku, on_hand = *counter, "Stock restored");
        }
    }

    /// Recorded counters, sorted by SKU.
    pub fn records(&self) -> BTreeMap<SkuId, u32> {
        self.on_hand
            .iter()
            .map(|(sku, quantity)| (sku.clone(), *quantity))
            .collect()
    }
}
