//! Placed orders and their status lifecycle.

pub mod book;

pub use book::*;
