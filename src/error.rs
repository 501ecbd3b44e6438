use thiserror::Error;

use crate::domain::{OrderId, OrderStatus, SkuId};

/// How a rejected operation should be surfaced to the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; re-prompt.
    Validation,
    /// The operation is not allowed in the current state; no retry helps.
    NotAllowed,
    /// Stock ran out between browsing and settlement.
    Unavailable,
    /// A collaborator could not be reached; safe to retry.
    Transient,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
    #[error("Quantity {requested} for {sku} exceeds the per-line cap of {cap}")]
    QuantityAboveCap { sku: SkuId, requested: u32, cap: u32 },
    #[error("Negative unit price for {0}")]
    NegativePrice(SkuId),
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockError {
    #[error("Item no longer available: {sku} (requested {requested}, available {available})")]
    Unavailable {
        sku: SkuId,
        requested: u32,
        available: u32,
    },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl StockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::ActorCommunicationError(_) => ErrorKind::Transient,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    #[error("Payment cannot {operation} while {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
    #[error("Payment already settled")]
    AlreadySettled,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredential(_) => ErrorKind::Validation,
            Self::InvalidState { .. } | Self::AlreadySettled => ErrorKind::NotAllowed,
        }
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),
    #[error("Cancellation not allowed: order {id} is {status}")]
    CancellationNotAllowed { id: OrderId, status: OrderStatus },
    #[error("Order {id} is already {status}")]
    AlreadyFinal { id: OrderId, status: OrderStatus },
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Duplicate order id: {0}")]
    DuplicateOrder(OrderId),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::CancellationNotAllowed { .. } | Self::AlreadyFinal { .. } => {
                ErrorKind::NotAllowed
            }
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::DuplicateOrder(_) | Self::ActorCommunicationError(_) => ErrorKind::Transient,
            Self::Stock(e) => e.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

/// Session-level error returned by [`crate::checkout::ShopperSession`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Checkout validation error: {0}")]
    ValidationError(String),
    #[error("No checkout in progress")]
    NoActiveCheckout,
    #[error("Cart is locked while a checkout is in progress")]
    CheckoutInProgress,
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cart(e) => e.kind(),
            Self::Stock(e) => e.kind(),
            Self::Payment(e) => e.kind(),
            Self::Order(e) => e.kind(),
            Self::Persistence(e) => e.kind(),
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NoActiveCheckout | Self::CheckoutInProgress => ErrorKind::NotAllowed,
        }
    }
}
