//! Per-SKU stock counters.

pub mod ledger;

pub use ledger::*;
