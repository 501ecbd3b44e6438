use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::{
    Cancellation, CheckoutId, Order, OrderCreate, OrderId, OrderStatus, Refund, StatusChange,
};
use crate::error::OrderError;

/// Rejects payloads that cannot become an order.
pub fn validate_new_order(payload: &OrderCreate) -> Result<(), OrderError> {
    if payload.lines.is_empty() {
        return Err(OrderError::ValidationError(
            "An order needs at least one line".to_string(),
        ));
    }
    if payload.delivery_address.trim().is_empty() {
        return Err(OrderError::ValidationError(
            "Delivery address is required".to_string(),
        ));
    }
    Ok(())
}

/// In-memory store of placed orders, indexed by id and by checkout attempt.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: HashMap<OrderId, Order>,
    by_checkout: HashMap<CheckoutId, OrderId>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the book from persisted orders.
    pub fn from_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let mut book = Self::new();
        for order in orders {
            book.by_checkout.insert(order.checkout_id(), order.id());
            book.orders.insert(order.id(), order);
        }
        book
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn find_by_checkout(&self, checkout_id: &CheckoutId) -> Option<&Order> {
        self.by_checkout
            .get(checkout_id)
            .and_then(|id| self.orders.get(id))
    }

    /// Inserts a new order at `Order Placed`.
    ///
    /// Re-submitting a checkout that already produced an order returns that
    /// order unchanged.
    #[instrument(fields(order_id = %id, checkout_id = %payload.checkout_id), skip(self, payload))]
    pub fn create(&mut self, id: OrderId, payload: OrderCreate) -> Result<Order, OrderError> {
        if let Some(existing) = self.find_by_checkout(&payload.checkout_id) {
            info!(existing = %existing.id(), "Checkout already placed");
            return Ok(existing.clone());
        }

        validate_new_order(&payload)?;

        if self.orders.contains_key(&id) {
            warn!("Order id collision");
            return Err(OrderError::DuplicateOrder(id));
        }

        let order = Order::from_create(id, payload, Utc::now());
        self.by_checkout.insert(order.checkout_id(), id);
        self.orders.insert(id, order.clone());
        info!(total = %order.bill().grand_total, "Order placed");
        Ok(order)
    }

    /// Moves the order one stage forward.
    pub fn advance(&mut self, id: &OrderId) -> Result<StatusChange, OrderError> {
        let order = self.orders.get_mut(id).ok_or(OrderError::NotFound(*id))?;
        let from = order.status();
        let to = from.next().ok_or(OrderError::AlreadyFinal {
            id: *id,
            status: from,
        })?;

        order.set_status(to);
        Ok(StatusChange {
            order_id: *id,
            from,
            to,
        })
    }

    /// Checks that `id` can still be cancelled, without changing anything.
    pub fn ensure_cancellable(&self, id: &OrderId) -> Result<&Order, OrderError> {
        let order = self.orders.get(id).ok_or(OrderError::NotFound(*id))?;
        if !order.status().is_cancellable() {
            return Err(OrderError::CancellationNotAllowed {
                id: *id,
                status: order.status(),
            });
        }
        Ok(order)
    }

    /// Cancels an order that is still `Order Placed` and records the refund note.
    pub fn cancel(&mut self, id: &OrderId, reason: String) -> Result<StatusChange, OrderError> {
        let refund = refund_for(self.ensure_cancellable(id)?);
        let order = self.orders.get_mut(id).ok_or(OrderError::NotFound(*id))?;
        let from = order.status();

        order.record_cancellation(Cancellation {
            reason,
            refund,
            cancelled_at: Utc::now(),
        });
        Ok(StatusChange {
            order_id: *id,
            from,
            to: OrderStatus::Cancelled,
        })
    }

    /// All orders, most recent first.
    pub fn list_by_recency(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        orders
    }

    /// Ids of orders that can still advance.
    pub fn active_ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|order| !order.status().is_terminal())
            .map(Order::id)
            .collect();
        ids.sort();
        ids
    }
}

fn refund_for(order: &Order) -> Refund {
    match order.transaction_id() {
        Some(transaction_id) if order.is_prepaid() => Refund::ToSource {
            amount: order.bill().grand_total,
            transaction_id: transaction_id.clone(),
        },
        _ => Refund::NotApplicable,
    }
}
