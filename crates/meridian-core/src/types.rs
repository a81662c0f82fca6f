//! # Domain Types
//!
//! Core domain types used throughout Meridian.
//!
//! ## Type Hierarchy
//! ```text
//! Parties:     User (+Role), Customer, SalesPerson, Manager, Supplier
//! Branches:    Branch, BranchAssignment (the assignment ledger)
//! Catalog:     ProductCategory, Product, PaymentMethod
//! Sales:       Cart, Sale (open line), CompletedSale (settlement)
//! Outbox:      NotificationOutboxEntry
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an `id` (UUID v4, immutable, used for relations); Sale
//! additionally carries a human-auditable `transaction_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::{Currency, Money};

// =============================================================================
// Roles & Users
// =============================================================================

/// Caller roles as supplied by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Salesperson,
    Supervisor,
    Manager,
    Supplier,
    Superuser,
}

impl Role {
    /// Staff roles may operate carts on behalf of customers.
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            Role::Salesperson | Role::Supervisor | Role::Manager | Role::Superuser
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Customer => "customer",
            Role::Salesperson => "salesperson",
            Role::Supervisor => "supervisor",
            Role::Manager => "manager",
            Role::Supplier => "supplier",
            Role::Superuser => "superuser",
        };
        f.write_str(s)
    }
}

/// A user account record. Credentials and authentication are owned by an
/// external collaborator; this is the profile the core needs (names and email
/// feed notification contexts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Full name as used in notification contexts.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// Party Aggregates
// =============================================================================

/// A customer profile, one-to-one with a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub phone_number: String,
    /// Tax registration pin, unique per customer.
    pub tax_pin: String,
    pub contact_person: String,
    pub address: String,
    pub user_id: String,
}

/// A salesperson profile, one-to-one with a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesPerson {
    pub id: String,
    pub phone_number: String,
    pub user_id: String,
}

/// A manager profile, one-to-one with a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Manager {
    pub id: String,
    pub phone_number: String,
    pub user_id: String,
}

/// A supplier profile, one-to-one with a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub phone_number: String,
    pub tax_pin: String,
    pub contact_person: String,
    pub notes: String,
    pub user_id: String,
}

// =============================================================================
// Branches & Assignment Ledger
// =============================================================================

/// A retail branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Unique per branch.
    pub email: String,
    /// Set at creation, immutable.
    pub opening_date: DateTime<Utc>,
}

/// One assignment interval of a salesperson to a branch.
///
/// Append-only except for the single `termination_date` write that closes an
/// interval. Invariant: for a given salesperson at most one entry is open
/// (termination_date = NULL) at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BranchAssignment {
    pub id: String,
    pub salesperson_id: String,
    pub branch_id: String,
    /// Set at creation, immutable.
    pub assignment_date: DateTime<Utc>,
    /// NULL while the assignment is active.
    pub termination_date: Option<DateTime<Utc>>,
}

impl BranchAssignment {
    /// An assignment is open while it has no termination date.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.termination_date.is_none()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category (read-mostly reference data).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductCategory {
    pub id: String,
    pub name: String,
}

/// A payment method (read-mostly reference data).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethod {
    pub id: String,
    pub method_name: String,
}

/// A product available for sale.
///
/// Invariant: `serial_number` present ⇒ `is_serialized`, decided at creation
/// and never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Purchase cost in minor units.
    pub cost_price_cents: i64,
    /// Selling price in minor units.
    pub selling_price_cents: i64,
    pub currency: Currency,
    pub is_serialized: bool,
    pub serial_number: Option<String>,
    pub category_id: Option<String>,
    pub branch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns the cost price as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents, self.currency)
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents, self.currency)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Who a cart line belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartOwner {
    Customer(String),
    Salesperson(String),
}

/// A cart line: (product, quantity) staged by a customer or salesperson.
///
/// The product reference is weak: deleting a product nulls `product_id` and
/// the cart row survives for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,
    pub number_of_items: i64,
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    pub salesperson_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sales
// =============================================================================

/// An open (uncommitted) sale line backed by a cart.
///
/// `is_completed` transitions false→true exactly once, at settlement, and
/// never reverts. The row itself is never deleted (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Derived at creation: cart.number_of_items × product.selling_price.
    pub amount_cents: i64,
    pub currency: Currency,
    /// Set at creation, immutable.
    pub transaction_date: DateTime<Utc>,
    pub awarded_points: i64,
    /// Globally unique, generated once at creation, immutable.
    /// Format: "TXN" + 7 digits + 4 uppercase letters + 5 digits.
    pub transaction_id: String,
    pub salesperson_id: String,
    pub cart_id: String,
    /// NULL until settlement.
    pub payment_method_id: Option<String>,
    pub is_completed: bool,
}

impl Sale {
    /// Returns the cached amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents, self.currency)
    }
}

/// The settlement aggregating all sale lines completed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompletedSale {
    pub id: String,
    /// Set at creation, immutable.
    pub completed_at: DateTime<Utc>,
    pub total_amount_cents: i64,
    pub currency: Currency,
    /// Snapshot of the salesperson's branch at completion time.
    pub branch_id: String,
    pub salesperson_id: String,
    pub payment_method_id: String,
}

impl CompletedSale {
    /// Returns the settlement total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents, self.currency)
    }
}

/// One row of a salesperson's monthly settlement summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MonthlySales {
    pub year: i64,
    pub month: i64,
    pub branch_name: String,
    pub number_of_sales: i64,
    pub total_amount_cents: i64,
    pub currency: Currency,
}

// =============================================================================
// Notification Outbox
// =============================================================================

/// Notification templates emitted by the assignment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum NotificationTemplate {
    Assignment,
    Termination,
}

impl fmt::Display for NotificationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTemplate::Assignment => f.write_str("assignment"),
            NotificationTemplate::Termination => f.write_str("termination"),
        }
    }
}

/// An entry in the notification outbox queue.
///
/// Uses the outbox pattern: queued in the same transaction as the ledger
/// mutation, delivered best-effort by a background worker after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NotificationOutboxEntry {
    pub id: String,
    pub template: NotificationTemplate,
    /// Recipient email address.
    pub recipient: String,
    /// Template context as JSON.
    pub context: String,
    /// Number of delivery attempts.
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    /// Set when successfully delivered.
    pub sent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_staff() {
        assert!(Role::Salesperson.is_staff());
        assert!(Role::Superuser.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(!Role::Supplier.is_staff());
    }

    #[test]
    fn test_assignment_is_open() {
        let mut entry = BranchAssignment {
            id: "a-1".to_string(),
            salesperson_id: "sp-1".to_string(),
            branch_id: "br-1".to_string(),
            assignment_date: Utc::now(),
            termination_date: None,
        };
        assert!(entry.is_open());

        entry.termination_date = Some(Utc::now());
        assert!(!entry.is_open());
    }

    #[test]
    fn test_product_money_helpers() {
        let product = Product {
            id: "p-1".to_string(),
            name: "Widget".to_string(),
            cost_price_cents: 7500,
            selling_price_cents: 10000,
            currency: Currency::Kes,
            is_serialized: false,
            serial_number: None,
            category_id: None,
            branch_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(product.selling_price().cents(), 10000);
        assert_eq!(product.cost_price().currency(), Currency::Kes);
    }

    #[test]
    fn test_notification_template_display() {
        assert_eq!(NotificationTemplate::Assignment.to_string(), "assignment");
        assert_eq!(NotificationTemplate::Termination.to_string(), "termination");
    }
}
