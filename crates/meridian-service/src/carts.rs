//! # Cart Operations
//!
//! Cart lines for customers and salespeople. Staff may operate any cart;
//! a customer only their own.

use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::Service;
use meridian_core::{Cart, CartOwner, Identity};
use meridian_db::CartLineView;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartListResponse {
    pub lines: Vec<CartLineView>,
    /// Sum over priced lines, in minor units.
    pub total_cents: i64,
    /// Lines whose product was deleted and could not be priced.
    pub unpriced_lines: usize,
}

impl Service {
    /// Resolves the user account behind a cart owner.
    async fn owner_user_id(&self, owner: &CartOwner) -> ApiResult<String> {
        match owner {
            CartOwner::Customer(id) => {
                let customer = self
                    .db()
                    .parties()
                    .get_customer(id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Customer", id))?;
                Ok(customer.user_id)
            }
            CartOwner::Salesperson(id) => {
                let user = self.db().parties().salesperson_user(id).await?;
                Ok(user.id)
            }
        }
    }

    /// Adds a cart line for the owner.
    pub async fn add_to_cart(
        &self,
        identity: &Identity,
        owner: &CartOwner,
        product_id: &str,
        quantity: i64,
    ) -> ApiResult<Cart> {
        let owner_user = self.owner_user_id(owner).await?;
        identity.require_cart_access(&owner_user)?;
        debug!(caller = %identity.user_id, product_id, quantity, "add_to_cart");

        Ok(self.db().carts().add_line(owner, product_id, quantity).await?)
    }

    /// Changes the quantity on a cart line.
    pub async fn update_cart_quantity(
        &self,
        identity: &Identity,
        cart_id: &str,
        quantity: i64,
    ) -> ApiResult<Cart> {
        let owner_user = self.db().carts().owner_user_id(cart_id).await?;
        identity.require_cart_access(&owner_user)?;

        Ok(self.db().carts().update_quantity(cart_id, quantity).await?)
    }

    /// Removes a cart line.
    pub async fn remove_from_cart(&self, identity: &Identity, cart_id: &str) -> ApiResult<()> {
        let owner_user = self.db().carts().owner_user_id(cart_id).await?;
        identity.require_cart_access(&owner_user)?;

        Ok(self.db().carts().delete(cart_id).await?)
    }

    /// Lists the owner's cart priced against the live catalog, with the
    /// aggregate total over priced lines.
    pub async fn list_cart(
        &self,
        identity: &Identity,
        owner: &CartOwner,
    ) -> ApiResult<CartListResponse> {
        let owner_user = self.owner_user_id(owner).await?;
        identity.require_cart_access(&owner_user)?;

        let lines = self.db().carts().list_for_owner(owner).await?;

        let mut total_cents: i64 = 0;
        let mut unpriced_lines = 0;
        for line in &lines {
            match line.line_total_cents {
                Some(cents) => {
                    total_cents = total_cents
                        .checked_add(cents)
                        .ok_or_else(|| ApiError::validation("cart total overflows"))?;
                }
                None => unpriced_lines += 1,
            }
        }

        Ok(CartListResponse {
            lines,
            total_cents,
            unpriced_lines,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
