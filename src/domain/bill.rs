use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Checkout bill derived from a set of cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub grand_total: Decimal,
}

impl Bill {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        }
    }
}

impl Default for Bill {
    fn default() -> Self {
        Self::zero()
    }
}
