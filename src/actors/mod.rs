//! Actors owning the shared stock ledger and order book.

pub mod order_service;
pub mod stock_service;

pub use order_service::*;
pub use stock_service::*;
