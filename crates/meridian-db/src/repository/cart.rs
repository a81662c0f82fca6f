//! # Cart Repository
//!
//! Database operations for cart lines.
//!
//! A cart line stages (product, quantity) for either a customer or a
//! salesperson. Listings are priced live against the product table so a price
//! change is reflected immediately; lines whose product was deleted list with
//! no price.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::validation::validate_quantity;
use meridian_core::{Cart, CartOwner, Currency, ValidationError, MAX_LINE_QUANTITY};

const CART_COLUMNS: &str =
    "id, number_of_items, product_id, customer_id, salesperson_id, created_at";

/// A cart line priced against the live product row.
///
/// Price fields are NULL when the product has been deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLineView {
    pub id: String,
    pub number_of_items: i64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub unit_price_cents: Option<i64>,
    /// number_of_items × unit price, in minor units.
    pub line_total_cents: Option<i64>,
    pub currency: Option<Currency>,
    pub created_at: chrono::DateTime<Utc>,
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    fn check_quantity(quantity: i64) -> DbResult<()> {
        validate_quantity(quantity).map_err(meridian_core::CoreError::from)?;
        if quantity > MAX_LINE_QUANTITY {
            return Err(meridian_core::CoreError::from(ValidationError::InvalidFormat {
                field: "number_of_items".to_string(),
                reason: format!("must not exceed {MAX_LINE_QUANTITY}"),
            })
            .into());
        }
        Ok(())
    }

    /// Adds a cart line for the given owner.
    pub async fn add_line(
        &self,
        owner: &CartOwner,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Cart> {
        Self::check_quantity(quantity)?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let (customer_id, salesperson_id) = match owner {
            CartOwner::Customer(id) => (Some(id.clone()), None),
            CartOwner::Salesperson(id) => (None, Some(id.clone())),
        };

        let cart = Cart {
            id: Uuid::new_v4().to_string(),
            number_of_items: quantity,
            product_id: Some(product_id.to_string()),
            customer_id,
            salesperson_id,
            created_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO carts ({CART_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ))
        .bind(&cart.id)
        .bind(cart.number_of_items)
        .bind(&cart.product_id)
        .bind(&cart.customer_id)
        .bind(&cart.salesperson_id)
        .bind(cart.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %cart.id, product_id = %product_id, quantity, "Added cart line");
        Ok(cart)
    }

    /// Gets a cart line by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Cart>> {
        let cart =
            sqlx::query_as::<_, Cart>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(cart)
    }

    /// Changes the quantity on a cart line.
    pub async fn update_quantity(&self, id: &str, quantity: i64) -> DbResult<Cart> {
        Self::check_quantity(quantity)?;

        let result = sqlx::query("UPDATE carts SET number_of_items = ?1 WHERE id = ?2")
            .bind(quantity)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", id))
    }

    /// Deletes a cart line.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", id));
        }

        Ok(())
    }

    /// Lists an owner's cart lines priced against the live product rows,
    /// newest first.
    pub async fn list_for_owner(&self, owner: &CartOwner) -> DbResult<Vec<CartLineView>> {
        let (column, owner_id) = match owner {
            CartOwner::Customer(id) => ("customer_id", id),
            CartOwner::Salesperson(id) => ("salesperson_id", id),
        };

        let rows = sqlx::query_as::<_, CartLineView>(&format!(
            r#"
            SELECT c.id, c.number_of_items, c.product_id,
                   p.name AS product_name,
                   p.selling_price_cents AS unit_price_cents,
                   c.number_of_items * p.selling_price_cents AS line_total_cents,
                   p.currency AS currency,
                   c.created_at
            FROM carts c
            LEFT JOIN products p ON p.id = c.product_id
            WHERE c.{column} = ?1
            ORDER BY c.created_at DESC, c.rowid DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Resolves the user account owning a cart line (for access checks).
    pub async fn owner_user_id(&self, cart_id: &str) -> DbResult<String> {
        let user_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT COALESCE(cu.user_id, sp.user_id)
            FROM carts c
            LEFT JOIN customers cu ON cu.id = c.customer_id
            LEFT JOIN salespersons sp ON sp.id = c.salesperson_id
            WHERE c.id = ?1
            "#,
        )
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await?;

        user_id.ok_or_else(|| DbError::not_found("Cart", cart_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
