//! Per-shopper façade tying the cart, payment attempt and actors together.

pub mod session;

pub use session::*;
