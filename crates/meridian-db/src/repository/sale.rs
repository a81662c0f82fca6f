//! # Sale Repository
//!
//! Database operations for open sale lines and settlements.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. OPEN                                                                │
//! │     └── create_open_sale() → Sale { is_completed: false }               │
//! │         amount = cart.number_of_items × product.selling_price           │
//! │         transaction_id stamped once, unique                             │
//! │                                                                         │
//! │  2. SETTLE (one transaction)                                            │
//! │     └── complete_sale() →                                               │
//! │         • all open lines of the salesperson flip to completed           │
//! │         • branch snapshotted from the latest ledger entry               │
//! │         • one CompletedSale row with the summed total                   │
//! │                                                                         │
//! │  Rows are never deleted: completed lines stay as the audit trail.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::txid::generate_transaction_id;
use meridian_core::{Cart, CompletedSale, CoreError, Currency, Money, MonthlySales, Product, Sale};

const SALE_COLUMNS: &str = "id, amount_cents, currency, transaction_date, awarded_points, \
     transaction_id, salesperson_id, cart_id, payment_method_id, is_completed";

const COMPLETED_COLUMNS: &str = "id, completed_at, total_amount_cents, currency, branch_id, \
     salesperson_id, payment_method_id";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Opens a sale line for a cart.
    ///
    /// The amount is priced at creation (quantity × current selling price)
    /// and the transaction id is stamped once. A transaction-id collision is
    /// retried once with a fresh id; a second collision surfaces as Conflict.
    pub async fn create_open_sale(&self, salesperson_id: &str, cart_id: &str) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM salespersons WHERE id = ?1")
                .bind(salesperson_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(DbError::not_found("SalesPerson", salesperson_id));
        }

        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, number_of_items, product_id, customer_id, salesperson_id, created_at
             FROM carts WHERE id = ?1",
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Cart", cart_id))?;

        let product_id = cart
            .product_id
            .as_deref()
            .ok_or_else(|| DbError::not_found("Product", format!("cart {cart_id}")))?;

        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, cost_price_cents, selling_price_cents, currency, is_serialized,
                    serial_number, category_id, branch_id, created_at
             FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let amount = product
            .selling_price()
            .multiply_quantity(cart.number_of_items)
            .map_err(CoreError::from)?;

        let mut sale = Sale {
            id: Uuid::new_v4().to_string(),
            amount_cents: amount.cents(),
            currency: amount.currency(),
            transaction_date: Utc::now(),
            awarded_points: 0,
            transaction_id: generate_transaction_id(),
            salesperson_id: salesperson_id.to_string(),
            cart_id: cart_id.to_string(),
            payment_method_id: None,
            is_completed: false,
        };

        match Self::insert_sale(&mut tx, &sale).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation_on("sales.transaction_id") => {
                warn!(transaction_id = %sale.transaction_id, "Transaction id collision, retrying");
                sale.transaction_id = generate_transaction_id();
                Self::insert_sale(&mut tx, &sale).await.map_err(|err| {
                    if err.is_unique_violation_on("sales.transaction_id") {
                        DbError::Domain(CoreError::conflict(
                            "transaction id collision persisted across retry",
                        ))
                    } else {
                        err
                    }
                })?;
            }
            Err(err) => return Err(err),
        }

        tx.commit().await?;
        debug!(id = %sale.id, transaction_id = %sale.transaction_id, "Opened sale line");
        Ok(sale)
    }

    async fn insert_sale(
        tx: &mut sqlx::SqliteConnection,
        sale: &Sale,
    ) -> DbResult<()> {
        sqlx::query(&format!(
            "INSERT INTO sales ({SALE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&sale.id)
        .bind(sale.amount_cents)
        .bind(sale.currency)
        .bind(sale.transaction_date)
        .bind(sale.awarded_points)
        .bind(&sale.transaction_id)
        .bind(&sale.salesperson_id)
        .bind(&sale.cart_id)
        .bind(&sale.payment_method_id)
        .bind(sale.is_completed)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// Settles all open sale lines of a salesperson as one settlement.
    ///
    /// One transaction: verifies there is something to settle and a payment
    /// method to settle with, snapshots the branch from the salesperson's
    /// latest ledger entry (open or closed), flips every open line to
    /// completed, and records a single [`CompletedSale`].
    ///
    /// ## Errors
    /// * `Domain(EmptyCart)` - no open sale lines
    /// * `Domain(MissingPaymentMethod)` - unknown payment method
    /// * `Domain(NoActiveBranch)` - salesperson has no ledger history at all
    pub async fn complete_sale(
        &self,
        salesperson_id: &str,
        payment_method_id: &str,
    ) -> DbResult<CompletedSale> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Live per-line pricing: quantity × current selling price. Lines
        // whose product was deleted fall back to the amount cached when the
        // sale was opened.
        let lines = sqlx::query_as::<_, (i64, Option<i64>, Option<Currency>, i64, Currency)>(
            r#"
            SELECT c.number_of_items,
                   p.selling_price_cents,
                   p.currency,
                   s.amount_cents,
                   s.currency
            FROM sales s
            JOIN carts c ON c.id = s.cart_id
            LEFT JOIN products p ON p.id = c.product_id
            WHERE s.salesperson_id = ?1 AND s.is_completed = 0
            "#,
        )
        .bind(salesperson_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(DbError::Domain(CoreError::EmptyCart {
                salesperson_id: salesperson_id.to_string(),
            }));
        }

        let method: Option<String> =
            sqlx::query_scalar("SELECT id FROM payment_methods WHERE id = ?1")
                .bind(payment_method_id)
                .fetch_optional(&mut *tx)
                .await?;
        if method.is_none() {
            return Err(DbError::Domain(CoreError::MissingPaymentMethod));
        }

        // Branch snapshot: the latest ledger entry counts even if it is
        // closed; only a salesperson with no history at all cannot settle.
        let branch_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT branch_id
            FROM branch_assignments
            WHERE salesperson_id = ?1
            ORDER BY assignment_date DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(salesperson_id)
        .fetch_optional(&mut *tx)
        .await?;
        let branch_id = branch_id.ok_or_else(|| {
            DbError::Domain(CoreError::NoActiveBranch {
                salesperson_id: salesperson_id.to_string(),
            })
        })?;

        let mut total: Option<Money> = None;
        for (quantity, live_price, live_currency, cached_cents, cached_currency) in lines {
            let line = match (live_price, live_currency) {
                (Some(cents), Some(currency)) => Money::from_cents(cents, currency)
                    .multiply_quantity(quantity)
                    .map_err(CoreError::from)?,
                _ => Money::from_cents(cached_cents, cached_currency),
            };
            total = Some(match total {
                Some(sum) => sum.try_add(line).map_err(CoreError::from)?,
                None => line,
            });
        }
        // lines is non-empty, checked above
        let total = total
            .ok_or_else(|| DbError::Internal("settlement total missing".to_string()))?;

        sqlx::query(
            r#"
            UPDATE sales
            SET is_completed = 1, payment_method_id = ?1
            WHERE salesperson_id = ?2 AND is_completed = 0
            "#,
        )
        .bind(payment_method_id)
        .bind(salesperson_id)
        .execute(&mut *tx)
        .await?;

        let completed = CompletedSale {
            id: Uuid::new_v4().to_string(),
            completed_at: now,
            total_amount_cents: total.cents(),
            currency: total.currency(),
            branch_id,
            salesperson_id: salesperson_id.to_string(),
            payment_method_id: payment_method_id.to_string(),
        };

        sqlx::query(&format!(
            "INSERT INTO completed_sales ({COMPLETED_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ))
        .bind(&completed.id)
        .bind(completed.completed_at)
        .bind(completed.total_amount_cents)
        .bind(completed.currency)
        .bind(&completed.branch_id)
        .bind(&completed.salesperson_id)
        .bind(&completed.payment_method_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            salesperson_id = %salesperson_id,
            settlement_id = %completed.id,
            total_cents = completed.total_amount_cents,
            "Sale completed"
        );
        Ok(completed)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Lists a salesperson's open sale lines, newest first.
    pub async fn list_open(&self, salesperson_id: &str) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE salesperson_id = ?1 AND is_completed = 0
            ORDER BY transaction_date DESC, rowid DESC
            "#
        ))
        .bind(salesperson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets a sale by its transaction id.
    pub async fn get_by_transaction_id(&self, transaction_id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE transaction_id = ?1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Lists a salesperson's settlements, newest first.
    pub async fn list_completed(&self, salesperson_id: &str) -> DbResult<Vec<CompletedSale>> {
        let rows = sqlx::query_as::<_, CompletedSale>(&format!(
            r#"
            SELECT {COMPLETED_COLUMNS}
            FROM completed_sales
            WHERE salesperson_id = ?1
            ORDER BY completed_at DESC, rowid DESC
            "#
        ))
        .bind(salesperson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Monthly settlement summary for a salesperson: settlements grouped by
    /// year, month and branch, newest month first.
    pub async fn monthly_summary(&self, salesperson_id: &str) -> DbResult<Vec<MonthlySales>> {
        let rows = sqlx::query_as::<_, MonthlySales>(
            r#"
            SELECT CAST(strftime('%Y', cs.completed_at) AS INTEGER) AS year,
                   CAST(strftime('%m', cs.completed_at) AS INTEGER) AS month,
                   b.name AS branch_name,
                   COUNT(*) AS number_of_sales,
                   SUM(cs.total_amount_cents) AS total_amount_cents,
                   MIN(cs.currency) AS currency
            FROM completed_sales cs
            JOIN branches b ON b.id = cs.branch_id
            WHERE cs.salesperson_id = ?1
            GROUP BY year, month, b.name
            ORDER BY year DESC, month DESC, b.name
            "#,
        )
        .bind(salesperson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::{
        seed_branch, seed_payment_method, seed_product, seed_salesperson, test_db,
    };
    use meridian_core::txid::is_valid_transaction_id;
    use meridian_core::CartOwner;

    async fn open_sale_for(
        db: &crate::pool::Database,
        salesperson_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Sale {
        let cart = db
            .carts()
            .add_line(
                &CartOwner::Salesperson(salesperson_id.to_string()),
                product_id,
                quantity,
            )
            .await
            .unwrap();
        db.sales()
            .create_open_sale(salesperson_id, &cart.id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_sale_prices_cart_and_stamps_transaction_id() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let soap = seed_product(&db, "Soap", 5000).await;

        let sale = open_sale_for(&db, &sp.id, &soap.id, 3).await;
        assert_eq!(sale.amount_cents, 15000);
        assert!(!sale.is_completed);
        assert!(is_valid_transaction_id(&sale.transaction_id));

        let found = db
            .sales()
            .get_by_transaction_id(&sale.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, sale.id);
    }

    #[tokio::test]
    async fn settlement_sums_all_open_lines() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;

        // 2 × 100 + 1 × 250 = 450 (prices in whole currency units as cents)
        let soap = seed_product(&db, "Soap", 100).await;
        let rice = seed_product(&db, "Rice", 250).await;
        open_sale_for(&db, &sp.id, &soap.id, 2).await;
        open_sale_for(&db, &sp.id, &rice.id, 1).await;

        let settlement = db.sales().complete_sale(&sp.id, &method.id).await.unwrap();
        assert_eq!(settlement.total_amount_cents, 450);
        assert_eq!(settlement.branch_id, branch.id);
        assert_eq!(settlement.payment_method_id, method.id);

        // All lines flipped, none left open
        assert!(db.sales().list_open(&sp.id).await.unwrap().is_empty());
        let completed = db.sales().list_completed(&sp.id).await.unwrap();
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn settlement_with_no_open_lines_is_rejected() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;

        let err = db.sales().complete_sale(&sp.id, &method.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart { .. })));

        // No settlement row was written by the rejected call
        assert!(db.sales().list_completed(&sp.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_settlement_without_new_lines_is_rejected() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        open_sale_for(&db, &sp.id, &soap.id, 1).await;
        db.sales().complete_sale(&sp.id, &method.id).await.unwrap();

        let err = db.sales().complete_sale(&sp.id, &method.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart { .. })));
        assert_eq!(db.sales().list_completed(&sp.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_payment_method_is_rejected() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let soap = seed_product(&db, "Soap", 100).await;

        open_sale_for(&db, &sp.id, &soap.id, 1).await;
        let err = db.sales().complete_sale(&sp.id, "missing").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::MissingPaymentMethod)
        ));

        // The open line survives the rejected settlement
        assert_eq!(db.sales().list_open(&sp.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settlement_without_any_ledger_history_is_rejected() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        open_sale_for(&db, &sp.id, &soap.id, 1).await;
        let err = db.sales().complete_sale(&sp.id, &method.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::NoActiveBranch { .. })
        ));
    }

    #[tokio::test]
    async fn settlement_uses_latest_ledger_branch_even_when_closed() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let west = seed_branch(&db, "Westlands").await;
        let east = seed_branch(&db, "Eastleigh").await;
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        db.branches().assign(&sp.id, &west.id).await.unwrap();
        db.branches().assign(&sp.id, &east.id).await.unwrap();

        // Close the open entry by hand: latest entry is now terminated
        sqlx::query(
            "UPDATE branch_assignments SET termination_date = ?1 WHERE termination_date IS NULL",
        )
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        open_sale_for(&db, &sp.id, &soap.id, 1).await;
        let settlement = db.sales().complete_sale(&sp.id, &method.id).await.unwrap();
        assert_eq!(settlement.branch_id, east.id);
    }

    #[tokio::test]
    async fn settlement_prices_lines_live() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        let sale = open_sale_for(&db, &sp.id, &soap.id, 2).await;
        assert_eq!(sale.amount_cents, 200);

        // Price rises before settlement: the settlement sees the new price
        db.catalog()
            .update_product(
                &soap.id,
                crate::repository::catalog::ProductUpdate {
                    selling_price_cents: Some(150),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let settlement = db.sales().complete_sale(&sp.id, &method.id).await.unwrap();
        assert_eq!(settlement.total_amount_cents, 300);
    }

    #[tokio::test]
    async fn deleted_product_settles_at_cached_amount() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        let sale = open_sale_for(&db, &sp.id, &soap.id, 2).await;
        assert_eq!(sale.amount_cents, 200);

        db.catalog().delete_product(&soap.id).await.unwrap();

        let settlement = db.sales().complete_sale(&sp.id, &method.id).await.unwrap();
        assert_eq!(settlement.total_amount_cents, 200);
    }

    #[tokio::test]
    async fn monthly_summary_groups_by_branch() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        db.branches().assign(&sp.id, &branch.id).await.unwrap();
        let method = seed_payment_method(&db, "Cash").await;
        let soap = seed_product(&db, "Soap", 100).await;

        open_sale_for(&db, &sp.id, &soap.id, 2).await;
        db.sales().complete_sale(&sp.id, &method.id).await.unwrap();
        open_sale_for(&db, &sp.id, &soap.id, 3).await;
        db.sales().complete_sale(&sp.id, &method.id).await.unwrap();

        let summary = db.sales().monthly_summary(&sp.id).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].branch_name, "Westlands");
        assert_eq!(summary[0].number_of_sales, 2);
        assert_eq!(summary[0].total_amount_cents, 500);
        let now = Utc::now();
        assert_eq!(summary[0].year, i64::from(chrono::Datelike::year(&now)));
    }
}
