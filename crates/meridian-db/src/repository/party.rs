//! # Party Repository
//!
//! Database operations for users and their role profiles (customer,
//! salesperson, manager, supplier).
//!
//! ## Composite Creation
//! A profile never exists without a user account, so each `create_*` inserts
//! the user row and the profile row in one transaction. The user's role is
//! fixed by the profile type, never supplied by the caller.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{validate_email, validate_required};
use meridian_core::{Customer, Manager, Role, SalesPerson, Supplier, User, MAX_SHORT_TEXT};

// =============================================================================
// Input Types
// =============================================================================

/// User account fields shared by all profile creations.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl NewUser {
    fn validate(&self) -> DbResult<()> {
        validate_required("username", &self.username, MAX_SHORT_TEXT)
            .map_err(meridian_core::CoreError::from)?;
        validate_required("first_name", &self.first_name, MAX_SHORT_TEXT)
            .map_err(meridian_core::CoreError::from)?;
        validate_required("last_name", &self.last_name, MAX_SHORT_TEXT)
            .map_err(meridian_core::CoreError::from)?;
        validate_email(&self.email).map_err(meridian_core::CoreError::from)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub user: NewUser,
    pub phone_number: String,
    pub tax_pin: String,
    pub contact_person: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct NewSalesPerson {
    pub user: NewUser,
    pub phone_number: String,
}

#[derive(Debug, Clone)]
pub struct NewManager {
    pub user: NewUser,
    pub phone_number: String,
}

#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub user: NewUser,
    pub phone_number: String,
    pub tax_pin: String,
    pub contact_person: String,
    pub notes: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for party database operations.
#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
}

impl PartyRepository {
    /// Creates a new PartyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PartyRepository { pool }
    }

    /// Inserts a user row on the given transaction. Shared by the composite
    /// profile constructors.
    async fn insert_user(
        tx: &mut sqlx::SqliteConnection,
        new: &NewUser,
        role: Role,
    ) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username.trim().to_string(),
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            email: new.email.trim().to_string(),
            role,
            is_active: true,
            date_joined: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, first_name, last_name, email, role, is_active, date_joined)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.date_joined)
        .execute(tx)
        .await?;

        Ok(user)
    }

    /// Creates a customer profile together with its user account.
    pub async fn create_customer(&self, new: NewCustomer) -> DbResult<Customer> {
        new.user.validate()?;

        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, &new.user, Role::Customer).await?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            tax_pin: new.tax_pin,
            contact_person: new.contact_person,
            address: new.address,
            user_id: user.id.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, phone_number, tax_pin, contact_person, address, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.phone_number)
        .bind(&customer.tax_pin)
        .bind(&customer.contact_person)
        .bind(&customer.address)
        .bind(&customer.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(id = %customer.id, username = %user.username, "Created customer");
        Ok(customer)
    }

    /// Creates a salesperson profile together with its user account.
    pub async fn create_salesperson(&self, new: NewSalesPerson) -> DbResult<SalesPerson> {
        new.user.validate()?;

        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, &new.user, Role::Salesperson).await?;

        let salesperson = SalesPerson {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            user_id: user.id.clone(),
        };

        sqlx::query("INSERT INTO salespersons (id, phone_number, user_id) VALUES (?1, ?2, ?3)")
            .bind(&salesperson.id)
            .bind(&salesperson.phone_number)
            .bind(&salesperson.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(id = %salesperson.id, username = %user.username, "Created salesperson");
        Ok(salesperson)
    }

    /// Creates a manager profile together with its user account.
    pub async fn create_manager(&self, new: NewManager) -> DbResult<Manager> {
        new.user.validate()?;

        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, &new.user, Role::Manager).await?;

        let manager = Manager {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            user_id: user.id.clone(),
        };

        sqlx::query("INSERT INTO managers (id, phone_number, user_id) VALUES (?1, ?2, ?3)")
            .bind(&manager.id)
            .bind(&manager.phone_number)
            .bind(&manager.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(id = %manager.id, username = %user.username, "Created manager");
        Ok(manager)
    }

    /// Creates a supplier profile together with its user account.
    pub async fn create_supplier(&self, new: NewSupplier) -> DbResult<Supplier> {
        new.user.validate()?;

        let mut tx = self.pool.begin().await?;
        let user = Self::insert_user(&mut tx, &new.user, Role::Supplier).await?;

        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            tax_pin: new.tax_pin,
            contact_person: new.contact_person,
            notes: new.notes,
            user_id: user.id.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, phone_number, tax_pin, contact_person, notes, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.phone_number)
        .bind(&supplier.tax_pin)
        .bind(&supplier.contact_person)
        .bind(&supplier.notes)
        .bind(&supplier.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(id = %supplier.id, username = %user.username, "Created supplier");
        Ok(supplier)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Gets a user by ID.
    pub async fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, first_name, last_name, email, role, is_active, date_joined
             FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a salesperson by ID.
    pub async fn get_salesperson(&self, id: &str) -> DbResult<Option<SalesPerson>> {
        let sp = sqlx::query_as::<_, SalesPerson>(
            "SELECT id, phone_number, user_id FROM salespersons WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sp)
    }

    /// Gets the user account behind a salesperson, or NotFound.
    pub async fn salesperson_user(&self, salesperson_id: &str) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email,
                   u.role, u.is_active, u.date_joined
            FROM users u
            JOIN salespersons sp ON sp.user_id = u.id
            WHERE sp.id = ?1
            "#,
        )
        .bind(salesperson_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| DbError::not_found("SalesPerson", salesperson_id))
    }

    /// Gets a customer by ID.
    pub async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, phone_number, tax_pin, contact_person, address, user_id
             FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all salespeople.
    pub async fn list_salespersons(&self) -> DbResult<Vec<SalesPerson>> {
        let rows = sqlx::query_as::<_, SalesPerson>(
            "SELECT id, phone_number, user_id FROM salespersons ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists all customers.
    pub async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>(
            "SELECT id, phone_number, tax_pin, contact_person, address, user_id
             FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists all suppliers.
    pub async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, Supplier>(
            "SELECT id, phone_number, tax_pin, contact_person, notes, user_id
             FROM suppliers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
