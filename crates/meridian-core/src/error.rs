//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Flow
//! ```text
//! ValidationError / MoneyError → CoreError → DbError (meridian-db)
//!                                          → ApiError (meridian-service)
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, field names)
//! 3. Errors are enum variants, never bare Strings
//! 4. Each variant maps to a user-facing message

use thiserror::Error;

use crate::money::MoneyError;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations or domain logic failures and are
/// surfaced to the caller with a structured message.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Salesperson is already assigned to the requested branch and the
    /// assignment is still open. No mutation is performed.
    #[error("Salesperson {salesperson_id} is already assigned to branch {branch_id}")]
    AlreadyAssigned {
        salesperson_id: String,
        branch_id: String,
    },

    /// Settlement attempted with nothing to settle.
    ///
    /// Raised when a salesperson has zero open sale rows, including
    /// re-invocation immediately after a successful settlement.
    #[error("Cannot complete sale: cart is empty for salesperson {salesperson_id}")]
    EmptyCart { salesperson_id: String },

    /// Settlement attempted without a resolvable payment method.
    #[error("A payment method must be present")]
    MissingPaymentMethod,

    /// Salesperson has no branch-assignment history at all, so a settlement
    /// cannot be attributed to any branch.
    #[error("Salesperson {salesperson_id} has no branch assignment")]
    NoActiveBranch { salesperson_id: String },

    /// Referenced entity absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A concurrent mutation would violate an invariant. Retryable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller's role does not permit the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Money arithmetic failure (overflow, currency mismatch).
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }

    /// Creates a Conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        CoreError::Conflict(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when client-supplied data violates a field/shape constraint,
/// before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. malformed email, bad currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. duplicate branch email).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadyAssigned {
            salesperson_id: "sp-1".to_string(),
            branch_id: "br-2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Salesperson sp-1 is already assigned to branch br-2"
        );

        let err = CoreError::EmptyCart {
            salesperson_id: "sp-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot complete sale: cart is empty for salesperson sp-1"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "payment_method".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
