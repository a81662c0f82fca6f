//! # Validation Module
//!
//! Business-rule validation for client-supplied input. Runs before any
//! database work; NOT NULL / UNIQUE / FK constraints in the schema form the
//! second line of defense.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a required text field is present and within length.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address shape.
///
/// Intentionally loose (one `@`, non-empty local and domain parts, a dot in
/// the domain); full RFC validation belongs to the mail collaborator.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let parts: Vec<&str> = email.split('@').collect();
    let valid = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity. Must be strictly positive.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "number_of_items".to_string(),
        });
    }
    Ok(())
}

/// Validates a price in minor units. Must not be negative.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Product Rules
// =============================================================================

/// Decides the `is_serialized` flag at product creation.
///
/// serial_number present ⇒ serialized. Decided once at creation; the flag is
/// never recomputed on update.
pub fn serialized_flag(serial_number: Option<&str>) -> bool {
    serial_number.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("name", "Main Branch", 50).is_ok());
        assert!(validate_required("name", "", 50).is_err());
        assert!(validate_required("name", "   ", 50).is_err());
        assert!(validate_required("name", &"x".repeat(51), 50).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("sales@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user@.bad").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_serialized_flag() {
        assert!(serialized_flag(Some("SN-001")));
        assert!(!serialized_flag(Some("   ")));
        assert!(!serialized_flag(None));
    }
}
