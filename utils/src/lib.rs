//! Shared utilities for accrual partitions.

pub mod logging;
pub mod stats;

pub use logging::{init_tracing, LogFormat};
pub use stats::StatsCounter;
