//! Bill computation: subtotal, tax, tiered delivery fee and grand total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::{Bill, CartLine};

/// Delivery fee charged when the subtotal reaches `min_subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTier {
    pub min_subtotal: Decimal,
    pub fee: Decimal,
}

/// Tax rate and delivery fee tiers used to build a [`Bill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    /// Sorted by descending `min_subtotal`; the first tier the subtotal
    /// reaches applies.
    pub delivery_tiers: Vec<DeliveryTier>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(5, 2),
            delivery_tiers: vec![
                DeliveryTier {
                    min_subtotal: Decimal::from(500),
                    fee: Decimal::ZERO,
                },
                DeliveryTier {
                    min_subtotal: Decimal::from(200),
                    fee: Decimal::from(25),
                },
                DeliveryTier {
                    min_subtotal: Decimal::ZERO,
                    fee: Decimal::from(40),
                },
            ],
        }
    }
}

impl PricingPolicy {
    pub fn delivery_fee(&self, subtotal: Decimal) -> Decimal {
        self.delivery_tiers
            .iter()
            .find(|tier| subtotal >= tier.min_subtotal)
            .map_or(Decimal::ZERO, |tier| tier.fee)
    }

    /// Builds the bill for `lines`.
    ///
    /// Tax is rounded on its own, then the grand total is rounded again after
    /// summing. Both use half-up rounding to whole units.
    pub fn compute_bill(&self, lines: &[CartLine]) -> Bill {
        if lines.is_empty() {
            return Bill::zero();
        }

        let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
        let tax = round_half_up(subtotal * self.tax_rate);
        let delivery_fee = self.delivery_fee(subtotal);
        let grand_total = round_half_up(subtotal + tax + delivery_fee);

        Bill {
            subtotal,
            tax,
            delivery_fee,
            grand_total,
        }
    }
}

/// Computes the bill for `lines` under the default policy.
pub fn compute_bill(lines: &[CartLine]) -> Bill {
    PricingPolicy::default().compute_bill(lines)
}

fn round_half_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
