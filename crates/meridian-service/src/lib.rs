//! # meridian-service: Operation Layer for Meridian
//!
//! The callable surface of the backend. Every operation takes the caller's
//! [`Identity`] (resolved by the auth collaborator), enforces the role gate,
//! orchestrates the repositories and returns serializable responses.
//!
//! ## Architecture Position
//! ```text
//! transport adapter (HTTP / RPC, out of scope here)
//!        │
//!        ▼
//! meridian-service (THIS CRATE)
//!   Service: branches · sales · carts · parties · catalog
//!        │
//!        ▼
//! meridian-db → meridian-core
//! ```
//!
//! ## Access Model
//! - Party and branch administration, catalog writes: superuser only
//! - Sales operations: the salesperson themself, or a superuser
//! - Carts: any staff role, or the owning customer
//!
//! ## Modules
//!
//! - [`branches`] - branch administration and the assignment ledger
//! - [`sales`] - open sale lines, settlement, summaries
//! - [`carts`] - cart lines with priced listings
//! - [`parties`] - user + profile creation
//! - [`catalog`] - products, categories, payment methods
//! - [`error`] - ApiError with stable codes
//! - [`telemetry`] - tracing subscriber setup for embedding binaries

pub mod branches;
pub mod carts;
pub mod catalog;
pub mod error;
pub mod parties;
pub mod sales;
pub mod telemetry;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use telemetry::init_tracing;
pub use meridian_core::{CartOwner, Identity, Role};

use meridian_db::Database;

/// The service facade. One instance per process; cheap to clone.
#[derive(Debug, Clone)]
pub struct Service {
    db: Database,
}

impl Service {
    /// Creates a service over an initialized database.
    pub fn new(db: Database) -> Self {
        Service { db }
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared fixtures for service tests.

    use super::*;
    use meridian_db::{DbConfig, NewSalesPerson, NewUser};

    pub async fn test_service() -> Service {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Service::new(db)
    }

    pub fn superuser() -> Identity {
        Identity::new("root", Role::Superuser)
    }

    /// Creates a salesperson and returns (profile id, identity acting as them).
    pub async fn seeded_salesperson(svc: &Service, n: u32) -> (String, Identity) {
        let sp = svc
            .db()
            .parties()
            .create_salesperson(NewSalesPerson {
                user: NewUser {
                    username: format!("sp{n}"),
                    first_name: format!("Sales{n}"),
                    last_name: "Person".to_string(),
                    email: format!("sp{n}@example.com"),
                },
                phone_number: format!("+2547000000{n:02}"),
            })
            .await
            .unwrap();
        let identity = Identity::new(sp.user_id.clone(), Role::Salesperson);
        (sp.id, identity)
    }
}
