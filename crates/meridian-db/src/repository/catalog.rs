//! # Catalog Repository
//!
//! Database operations for products, categories and payment methods.
//!
//! Categories and payment methods are read-mostly reference data. Products
//! carry the serialization rule: a serial number at creation marks the
//! product serialized, and that flag is never recomputed on update.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::validation::{serialized_flag, validate_price_cents, validate_required};
use meridian_core::{Currency, PaymentMethod, Product, ProductCategory, MAX_SHORT_TEXT};

const PRODUCT_COLUMNS: &str = "id, name, cost_price_cents, selling_price_cents, currency, \
     is_serialized, serial_number, category_id, branch_id, created_at";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for product creation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    pub serial_number: Option<String>,
    pub category_id: Option<String>,
    pub branch_id: Option<String>,
}

/// Fields for product update. `is_serialized` is deliberately absent: the
/// flag is decided once at creation.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub cost_price_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub serial_number: Option<Option<String>>,
    pub category_id: Option<Option<String>>,
    pub branch_id: Option<Option<String>>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a product category.
    pub async fn create_category(&self, name: &str) -> DbResult<ProductCategory> {
        validate_required("name", name, MAX_SHORT_TEXT).map_err(meridian_core::CoreError::from)?;

        let category = ProductCategory {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO product_categories (id, name) VALUES (?1, ?2)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    /// Lists all categories.
    pub async fn list_categories(&self) -> DbResult<Vec<ProductCategory>> {
        let rows = sqlx::query_as::<_, ProductCategory>(
            "SELECT id, name FROM product_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Payment Methods
    // =========================================================================

    /// Creates a payment method.
    pub async fn create_payment_method(&self, method_name: &str) -> DbResult<PaymentMethod> {
        validate_required("method_name", method_name, MAX_SHORT_TEXT)
            .map_err(meridian_core::CoreError::from)?;

        let method = PaymentMethod {
            id: Uuid::new_v4().to_string(),
            method_name: method_name.trim().to_string(),
        };

        sqlx::query("INSERT INTO payment_methods (id, method_name) VALUES (?1, ?2)")
            .bind(&method.id)
            .bind(&method.method_name)
            .execute(&self.pool)
            .await?;

        Ok(method)
    }

    /// Gets a payment method by ID.
    pub async fn get_payment_method(&self, id: &str) -> DbResult<Option<PaymentMethod>> {
        let method = sqlx::query_as::<_, PaymentMethod>(
            "SELECT id, method_name FROM payment_methods WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(method)
    }

    /// Lists all payment methods.
    pub async fn list_payment_methods(&self) -> DbResult<Vec<PaymentMethod>> {
        let rows = sqlx::query_as::<_, PaymentMethod>(
            "SELECT id, method_name FROM payment_methods ORDER BY method_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product. `is_serialized` is derived from the presence of a
    /// serial number, here and nowhere else.
    pub async fn create_product(&self, new: NewProduct) -> DbResult<Product> {
        validate_required("name", &new.name, MAX_SHORT_TEXT)
            .map_err(meridian_core::CoreError::from)?;
        validate_price_cents("cost_price", new.cost_price_cents)
            .map_err(meridian_core::CoreError::from)?;
        validate_price_cents("selling_price", new.selling_price_cents)
            .map_err(meridian_core::CoreError::from)?;

        let serial_number = new
            .serial_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            cost_price_cents: new.cost_price_cents,
            selling_price_cents: new.selling_price_cents,
            currency: Currency::default(),
            is_serialized: serialized_flag(serial_number.as_deref()),
            serial_number,
            category_id: new.category_id,
            branch_id: new.branch_id,
            created_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.currency)
        .bind(product.is_serialized)
        .bind(&product.serial_number)
        .bind(&product.category_id)
        .bind(&product.branch_id)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, name = %product.name, serialized = product.is_serialized, "Created product");
        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Updates a product. Only supplied fields change; `is_serialized` keeps
    /// its creation-time value even when the serial number changes.
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        let mut product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(name) = update.name {
            validate_required("name", &name, MAX_SHORT_TEXT)
                .map_err(meridian_core::CoreError::from)?;
            product.name = name.trim().to_string();
        }
        if let Some(cents) = update.cost_price_cents {
            validate_price_cents("cost_price", cents).map_err(meridian_core::CoreError::from)?;
            product.cost_price_cents = cents;
        }
        if let Some(cents) = update.selling_price_cents {
            validate_price_cents("selling_price", cents)
                .map_err(meridian_core::CoreError::from)?;
            product.selling_price_cents = cents;
        }
        if let Some(serial) = update.serial_number {
            product.serial_number = serial;
        }
        if let Some(category) = update.category_id {
            product.category_id = category;
        }
        if let Some(branch) = update.branch_id {
            product.branch_id = branch;
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?1, cost_price_cents = ?2, selling_price_cents = ?3,
                serial_number = ?4, category_id = ?5, branch_id = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&product.name)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(&product.serial_number)
        .bind(&product.category_id)
        .bind(&product.branch_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Deletes a product. Cart lines referencing it keep their rows with the
    /// product reference nulled.
    pub async fn delete_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Deleted product");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
