use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product was not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// An order with this ID already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The store is unreachable or refused the operation.
    ///
    /// Transient by assumption; callers on the webhook path translate this
    /// into a retryable response so the provider redelivers.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
