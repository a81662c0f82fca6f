//! # Sale Operations
//!
//! Opening sale lines, settlement and summaries. A salesperson operates only
//! their own sales; a superuser may operate anyone's.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::Service;
use meridian_core::{CompletedSale, Currency, Identity, MonthlySales, Sale};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSaleResponse {
    pub sale_id: String,
    pub transaction_id: String,
    pub amount_cents: i64,
    pub currency: Currency,
}

impl From<Sale> for OpenSaleResponse {
    fn from(s: Sale) -> Self {
        OpenSaleResponse {
            sale_id: s.id,
            transaction_id: s.transaction_id,
            amount_cents: s.amount_cents,
            currency: s.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub settlement_id: String,
    pub total_amount_cents: i64,
    pub currency: Currency,
    pub branch_id: String,
    pub payment_method_id: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl From<CompletedSale> for SettlementResponse {
    fn from(c: CompletedSale) -> Self {
        SettlementResponse {
            settlement_id: c.id,
            total_amount_cents: c.total_amount_cents,
            currency: c.currency,
            branch_id: c.branch_id,
            payment_method_id: c.payment_method_id,
            completed_at: c.completed_at,
        }
    }
}

impl Service {
    async fn require_sales_access(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<()> {
        let user = self.db().parties().salesperson_user(salesperson_id).await?;
        identity.require_salesperson(&user.id)?;
        Ok(())
    }

    /// Opens a sale line for a cart, pricing it and stamping a transaction id.
    pub async fn open_sale(
        &self,
        identity: &Identity,
        salesperson_id: &str,
        cart_id: &str,
    ) -> ApiResult<OpenSaleResponse> {
        self.require_sales_access(identity, salesperson_id).await?;
        debug!(caller = %identity.user_id, salesperson_id, cart_id, "open_sale");

        let sale = self
            .db()
            .sales()
            .create_open_sale(salesperson_id, cart_id)
            .await?;
        Ok(sale.into())
    }

    /// Settles all of the salesperson's open sale lines as one settlement.
    pub async fn complete_sale(
        &self,
        identity: &Identity,
        salesperson_id: &str,
        payment_method_id: &str,
    ) -> ApiResult<SettlementResponse> {
        self.require_sales_access(identity, salesperson_id).await?;
        debug!(caller = %identity.user_id, salesperson_id, payment_method_id, "complete_sale");

        let settlement = self
            .db()
            .sales()
            .complete_sale(salesperson_id, payment_method_id)
            .await?;
        Ok(settlement.into())
    }

    /// Lists the salesperson's open sale lines, newest first.
    pub async fn list_open_sales(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<Vec<Sale>> {
        self.require_sales_access(identity, salesperson_id).await?;
        Ok(self.db().sales().list_open(salesperson_id).await?)
    }

    /// Lists the salesperson's settlements, newest first.
    pub async fn list_settlements(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<Vec<CompletedSale>> {
        self.require_sales_access(identity, salesperson_id).await?;
        Ok(self.db().sales().list_completed(salesperson_id).await?)
    }

    /// Monthly settlement summary grouped by year, month and branch.
    pub async fn monthly_sales_summary(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<Vec<MonthlySales>> {
        self.require_sales_access(identity, salesperson_id).await?;
        Ok(self.db().sales().monthly_summary(salesperson_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
