//! Step sequences and their aggregated status
//!
//! This module owns the sequential runner and the status aggregation it
//! publishes to observers.

pub mod runner;
pub mod status;

// Re-export main types
pub use runner::*;
pub use status::*;
