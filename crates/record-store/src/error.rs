use thiserror::Error;

use crate::OrderId;

/// The two independent keyed collections held by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Orders,
    Payments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::Payments => "payments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the given key.
    #[error("Record not found in {collection}: {key}")]
    RecordNotFound { collection: Collection, key: OrderId },

    /// A conditional write was rejected because the stored record no longer
    /// matched the expected prior state.
    #[error(
        "Conditional write rejected for {collection} record {key}: expected status {expected}, found {actual}"
    )]
    ConditionFailed {
        collection: Collection,
        key: OrderId,
        expected: String,
        actual: String,
    },

    /// The store could not be reached or refused the operation.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
