use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Bill, CartLine, TransactionId};

/// Time-ordered order identifier. Later orders compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a single checkout attempt, from payment start to settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutId(Uuid);

impl CheckoutId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed order progression. `Cancelled` branches off `OrderPlaced` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    Confirmed,
    Preparing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The status that follows this one, or `None` for terminal states.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::OrderPlaced => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn is_cancellable(self) -> bool {
        self == Self::OrderPlaced
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Refund note attached to a cancelled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refund {
    ToSource {
        amount: Decimal,
        transaction_id: TransactionId,
    },
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub refund: Refund,
    pub cancelled_at: DateTime<Utc>,
}

/// Payload for placing a new order from a settled checkout.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub checkout_id: CheckoutId,
    pub lines: Vec<CartLine>,
    pub bill: Bill,
    pub payment_method: String,
    /// Whether the shopper already paid, which decides the refund on cancel.
    pub prepaid: bool,
    pub transaction_id: Option<TransactionId>,
    pub delivery_address: String,
}

/// Represents a placed order.
///
/// Line items and the bill are frozen at creation; only the status and the
/// cancellation record change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    checkout_id: CheckoutId,
    status: OrderStatus,
    items: Vec<CartLine>,
    bill: Bill,
    created_at: DateTime<Utc>,
    payment_method: String,
    #[serde(default)]
    prepaid: bool,
    transaction_id: Option<TransactionId>,
    delivery_address: String,
    cancellation: Option<Cancellation>,
}

impl Order {
    pub(crate) fn from_create(id: OrderId, payload: OrderCreate, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            checkout_id: payload.checkout_id,
            status: OrderStatus::OrderPlaced,
            items: payload.lines,
            bill: payload.bill,
            created_at,
            payment_method: payload.payment_method,
            prepaid: payload.prepaid,
            transaction_id: payload.transaction_id,
            delivery_address: payload.delivery_address,
            cancellation: None,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn checkout_id(&self) -> CheckoutId {
        self.checkout_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn bill(&self) -> &Bill {
        &self.bill
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn is_prepaid(&self) -> bool {
        self.prepaid
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn delivery_address(&self) -> &str {
        &self.delivery_address
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub(crate) fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    pub(crate) fn record_cancellation(&mut self, cancellation: Cancellation) {
        self.status = OrderStatus::Cancelled;
        self.cancellation = Some(cancellation);
    }
}

/// Emitted to subscribers whenever an order changes status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}
