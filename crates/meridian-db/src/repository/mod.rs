//! # Repository Implementations
//!
//! One repository per aggregate, each owning the SQL for its tables:
//!
//! - [`party`] - users plus customer/salesperson/manager/supplier profiles
//! - [`branch`] - branches and the assignment ledger
//! - [`catalog`] - products, categories, payment methods
//! - [`cart`] - cart lines with priced views
//! - [`sale`] - open sale lines and settlements
//! - [`outbox`] - the notification outbox queue

pub mod branch;
pub mod cart;
pub mod catalog;
pub mod outbox;
pub mod party;
pub mod sale;

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared fixtures for repository tests. Every test runs against a fresh
    //! in-memory database with migrations applied.

    use crate::pool::{Database, DbConfig};
    use crate::repository::catalog::NewProduct;
    use crate::repository::party::{NewSalesPerson, NewUser};
    use meridian_core::{Branch, PaymentMethod, Product, SalesPerson};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn new_user(n: u32) -> NewUser {
        NewUser {
            username: format!("user{n}"),
            first_name: format!("First{n}"),
            last_name: format!("Last{n}"),
            email: format!("user{n}@example.com"),
        }
    }

    pub async fn seed_salesperson(db: &Database, n: u32) -> SalesPerson {
        db.parties()
            .create_salesperson(NewSalesPerson {
                user: new_user(n),
                phone_number: format!("+2547000000{n:02}"),
            })
            .await
            .unwrap()
    }

    pub async fn seed_branch(db: &Database, name: &str) -> Branch {
        db.branches()
            .create_branch(name, "+254711000000", &format!("{name}@example.com"))
            .await
            .unwrap()
    }

    pub async fn seed_product(db: &Database, name: &str, selling_cents: i64) -> Product {
        db.catalog()
            .create_product(NewProduct {
                name: name.to_string(),
                cost_price_cents: selling_cents / 2,
                selling_price_cents: selling_cents,
                serial_number: None,
                category_id: None,
                branch_id: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_payment_method(db: &Database, name: &str) -> PaymentMethod {
        db.catalog().create_payment_method(name).await.unwrap()
    }
}
