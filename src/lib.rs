//! Transactional cart, stock, checkout and order-lifecycle engine.
//!
//! Shared state lives in two tokio actors: the stock actor owns the per-SKU
//! counters and the order actor owns placed orders. Each processes one
//! message at a time, so a settlement-time stock re-check and its deduction
//! cannot interleave with another checkout. Shoppers work through a
//! [`checkout::ShopperSession`], which holds their cart and payment attempt.

pub mod actors;
pub mod app_system;
pub mod cart;
pub mod checkout;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod messages;
pub mod orders;
pub mod payment;
pub mod persistence;
pub mod pricing;
pub mod stock;

#[cfg(test)]
mod mock_framework;
#[cfg(test)]
mod integration_tests;

pub use app_system::ShopSystem;
pub use checkout::ShopperSession;
pub use config::EngineConfig;
pub use error::{CheckoutError, ErrorKind};
