//! Shopper cart: the active cart plus the pre-login pending cart.

pub mod lines;
pub mod store;

pub use lines::*;
pub use store::*;
