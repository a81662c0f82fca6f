//! # Catalog Operations
//!
//! Product, category and payment-method administration. Writes are
//! superuser-only; anyone authenticated may read the catalog.

use tracing::debug;

use crate::error::ApiResult;
use crate::Service;
use meridian_core::{Identity, PaymentMethod, Product, ProductCategory};
use meridian_db::{NewProduct, ProductUpdate};

impl Service {
    /// Creates a product category. Superuser only.
    pub async fn create_category(
        &self,
        identity: &Identity,
        name: &str,
    ) -> ApiResult<ProductCategory> {
        identity.require_superuser()?;
        Ok(self.db().catalog().create_category(name).await?)
    }

    /// Lists all categories.
    pub async fn list_categories(&self, _identity: &Identity) -> ApiResult<Vec<ProductCategory>> {
        Ok(self.db().catalog().list_categories().await?)
    }

    /// Creates a payment method. Superuser only.
    pub async fn create_payment_method(
        &self,
        identity: &Identity,
        method_name: &str,
    ) -> ApiResult<PaymentMethod> {
        identity.require_superuser()?;
        Ok(self.db().catalog().create_payment_method(method_name).await?)
    }

    /// Lists all payment methods.
    pub async fn list_payment_methods(
        &self,
        _identity: &Identity,
    ) -> ApiResult<Vec<PaymentMethod>> {
        Ok(self.db().catalog().list_payment_methods().await?)
    }

    /// Creates a product. Superuser only.
    pub async fn create_product(
        &self,
        identity: &Identity,
        new: NewProduct,
    ) -> ApiResult<Product> {
        identity.require_superuser()?;
        debug!(caller = %identity.user_id, name = %new.name, "create_product");

        Ok(self.db().catalog().create_product(new).await?)
    }

    /// Gets a product by ID.
    pub async fn get_product(
        &self,
        _identity: &Identity,
        product_id: &str,
    ) -> ApiResult<Option<Product>> {
        Ok(self.db().catalog().get_product(product_id).await?)
    }

    /// Lists all products.
    pub async fn list_products(&self, _identity: &Identity) -> ApiResult<Vec<Product>> {
        Ok(self.db().catalog().list_products().await?)
    }

    /// Updates a product. Superuser only.
    pub async fn update_product(
        &self,
        identity: &Identity,
        product_id: &str,
        update: ProductUpdate,
    ) -> ApiResult<Product> {
        identity.require_superuser()?;
        Ok(self.db().catalog().update_product(product_id, update).await?)
    }

    /// Deletes a product. Superuser only. Cart lines referencing it survive
    /// unpriced.
    pub async fn delete_product(&self, identity: &Identity, product_id: &str) -> ApiResult<()> {
        identity.require_superuser()?;
        Ok(self.db().catalog().delete_product(product_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
