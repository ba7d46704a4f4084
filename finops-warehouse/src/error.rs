//! Error types for the `finops-warehouse` crate.

use thiserror::Error;

/// Errors raised while extracting, loading, or querying billing data.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A month string was not in `YYYY-MM` form.
    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("Warehouse lock poisoned: {0}")]
    Lock(String),
}

/// A convenience result type for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;
