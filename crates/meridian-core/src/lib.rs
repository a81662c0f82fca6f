//! # meridian-core: Pure Business Logic for Meridian
//!
//! The heart of the system: all business logic as pure functions and types
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! meridian-service (operations, identity checks)
//!        │
//!        ▼
//! meridian-db (SQLite repositories, transactions)
//!        │
//!        ▼
//! meridian-core (THIS CRATE)
//!   types · money · assignment · txid · validation · access · error
//!   NO I/O · NO DATABASE · NO NETWORK · PURE FUNCTIONS
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (parties, branches, catalog, sales, outbox)
//! - [`money`] - Money type with checked integer arithmetic
//! - [`assignment`] - Branch-assignment ledger transition decisions
//! - [`txid`] - Sale transaction-id generation
//! - [`validation`] - Business rule validation
//! - [`access`] - Caller identity and role gates
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **Integer money**: all monetary values are minor units (i64)
//! 4. **Explicit errors**: typed errors, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod assignment;
pub mod error;
pub mod money;
pub mod txid;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::Identity;
pub use assignment::{decide_assignment, AssignmentAction};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Currency, Money, MoneyError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single cart line.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum field length used for names, phone numbers and similar short text.
pub const MAX_SHORT_TEXT: usize = 50;
