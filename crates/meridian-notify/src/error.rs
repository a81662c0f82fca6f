//! Error types for notification delivery.

use thiserror::Error;

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery backend rejected or failed the send.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The stored context is not the JSON the template expects.
    #[error("Bad template context: {0}")]
    BadContext(String),

    /// Outbox bookkeeping failed.
    #[error(transparent)]
    Db(#[from] meridian_db::DbError),
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
