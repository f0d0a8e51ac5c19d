//! Analysis modules.
//!
//! Derived views of the current result set used to feed the charts.

pub mod aggregator;

pub use aggregator::*;
