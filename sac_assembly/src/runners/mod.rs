//! Run drivers.
//!
//! - [`Runner`]: steps one environment through an assembled unit list
//! - [`RunLimits`]: step and episode budgets for a run

pub mod runner;

pub use runner::{RunLimits, Runner};

#[cfg(test)]
mod tests;
