//! # meridian-db: Database Layer for Meridian
//!
//! SQLite persistence for the Meridian sales backend, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! meridian-service (operations, identity checks)
//!        │
//!        ▼
//! meridian-db (THIS CRATE)
//!   pool · migrations · error · repository/{party,branch,catalog,cart,sale,outbox}
//!        │
//!        ▼
//! SQLite database (WAL mode, foreign keys on)
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Transaction Discipline
//!
//! Every read-modify-write (branch assignment, sale settlement) runs inside a
//! single transaction: decisions are made against rows read in the same
//! transaction that writes them. Notification rows are queued into the outbox
//! table within that transaction, so a ledger mutation and its notifications
//! commit or roll back together.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/meridian.db")).await?;
//! let assignment = db.branches().assign("sp-1", "br-2").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::branch::BranchRepository;
pub use repository::cart::{CartLineView, CartRepository};
pub use repository::catalog::{CatalogRepository, NewProduct, ProductUpdate};
pub use repository::outbox::OutboxRepository;
pub use repository::party::{
    NewCustomer, NewManager, NewSalesPerson, NewSupplier, NewUser, PartyRepository,
};
pub use repository::sale::SaleRepository;
