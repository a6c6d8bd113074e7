//! Unified error type for the inventory backend.
//!
//! Validation failures are raised before any write happens. Storage failures are
//! propagated as-is so that a caller never mistakes an unaudited mutation for a
//! successful one.

use thiserror::Error;

/// All errors surfaced by the core, configuration and scheduler layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Input rejected before any mutation
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the rejected input
        message: String,
    },

    /// A product with this SKU already exists
    #[error("SKU already exists: {sku}")]
    DuplicateSku {
        /// The conflicting SKU
        sku: String,
    },

    /// Referenced product does not exist
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The missing product ID
        id: i64,
    },

    /// Movement type outside IN/OUT/MOVE/ADJUST
    #[error("Invalid movement type: {value}")]
    InvalidMovementType {
        /// The unrecognised value
        value: String,
    },

    /// Persisted bookkeeping value could not be read back
    #[error("Stored state error: {key}: {message}")]
    StoredState {
        /// Key of the `system_state` row
        key: String,
        /// Description of the problem
        message: String,
    },

    /// Durable store failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure (model artifacts, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model artifact (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
