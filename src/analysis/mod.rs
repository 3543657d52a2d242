//! Analysis modules.
//!
//! Results are first folded into per-package groups, then the groups are
//! classified into skip lists.

pub mod aggregator;
pub mod classifier;

pub use aggregator::aggregate;
pub use classifier::{classify, expected_total, Classification};
