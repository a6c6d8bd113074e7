//! Core business logic - framework-agnostic inventory, audit and forecasting operations.
//!
//! Every mutation (product or movement creation) commits together with its audit
//! chain entry. Training and forecasting only read.

/// Tamper-evident audit chain
pub mod audit;
/// Demand forecasting (moving average, linear regression)
pub mod forecast;
/// Per-product OUT-movement histories
pub mod history;
/// Filesystem store for trained model artifacts
pub mod model_store;
/// Stock movement recording and queries
pub mod movement;
/// Product creation and lookup
pub mod product;
/// On-hand stock and reorder checks
pub mod stock;
/// Per-product model training
pub mod training;

use serde::Deserialize;

/// Offset/limit window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Page {
    /// Rows to skip
    pub offset: u64,
    /// Maximum rows to return
    pub limit: u64,
}

impl Page {
    /// Rows returned when no limit is given.
    pub const DEFAULT_LIMIT: u64 = 100;

    /// Window starting at `offset` with at most `limit` rows.
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}
