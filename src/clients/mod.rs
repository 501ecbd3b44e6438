//! Cloneable handles for talking to the stock and order actors.

#[macro_use]
mod macros;

pub mod order_client;
pub mod stock_client;

pub use order_client::*;
pub use stock_client::*;
