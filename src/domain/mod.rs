//! Business entities shared by the cart, stock, payment and order components.

pub mod bill;
pub mod cart_line;
pub mod order;
pub mod payment;

pub use bill::*;
pub use cart_line::*;
pub use order::*;
pub use payment::*;
