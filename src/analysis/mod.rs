//! Analysis modules.
//!
//! Yearly aggregation of chart rows and the append-merge applied before
//! results are persisted.

pub mod aggregator;
pub mod merge;

pub use aggregator::*;
pub use merge::merge_append;
