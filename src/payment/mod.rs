//! Simulated payment flow for one checkout attempt.

pub mod simulator;

pub use simulator::*;
