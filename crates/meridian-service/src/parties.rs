//! # Party Operations
//!
//! User + profile administration. Superuser only: parties are onboarded by an
//! administrator, never self-registered through this surface.

use tracing::debug;

use crate::error::ApiResult;
use crate::Service;
use meridian_core::{Customer, Identity, Manager, SalesPerson, Supplier};
use meridian_db::{NewCustomer, NewManager, NewSalesPerson, NewSupplier};

impl Service {
    /// Creates a customer profile with its user account.
    pub async fn create_customer(
        &self,
        identity: &Identity,
        new: NewCustomer,
    ) -> ApiResult<Customer> {
        identity.require_superuser()?;
        debug!(caller = %identity.user_id, username = %new.user.username, "create_customer");

        Ok(self.db().parties().create_customer(new).await?)
    }

    /// Creates a salesperson profile with its user account.
    pub async fn create_salesperson(
        &self,
        identity: &Identity,
        new: NewSalesPerson,
    ) -> ApiResult<SalesPerson> {
        identity.require_superuser()?;
        debug!(caller = %identity.user_id, username = %new.user.username, "create_salesperson");

        Ok(self.db().parties().create_salesperson(new).await?)
    }

    /// Creates a manager profile with its user account.
    pub async fn create_manager(&self, identity: &Identity, new: NewManager) -> ApiResult<Manager> {
        identity.require_superuser()?;
        Ok(self.db().parties().create_manager(new).await?)
    }

    /// Creates a supplier profile with its user account.
    pub async fn create_supplier(
        &self,
        identity: &Identity,
        new: NewSupplier,
    ) -> ApiResult<Supplier> {
        identity.require_superuser()?;
        Ok(self.db().parties().create_supplier(new).await?)
    }

    /// Lists all salespeople. Superuser only.
    pub async fn list_salespersons(&self, identity: &Identity) -> ApiResult<Vec<SalesPerson>> {
        identity.require_superuser()?;
        Ok(self.db().parties().list_salespersons().await?)
    }

    /// Lists all customers. Superuser only.
    pub async fn list_customers(&self, identity: &Identity) -> ApiResult<Vec<Customer>> {
        identity.require_superuser()?;
        Ok(self.db().parties().list_customers().await?)
    }

    /// Lists all suppliers. Superuser only.
    pub async fn list_suppliers(&self, identity: &Identity) -> ApiResult<Vec<Supplier>> {
        identity.require_superuser()?;
        Ok(self.db().parties().list_suppliers().await?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::testutil::{superuser, test_service};
    use meridian_core::{Identity, Role};
    use meridian_db::{NewSalesPerson, NewUser};

    fn new_salesperson(n: u32) -> NewSalesPerson {
        NewSalesPerson {
            user: NewUser {
                username: format!("sp{n}"),
                first_name: format!("Sales{n}"),
                last_name: "Person".to_string(),
                email: format!("sp{n}@example.com"),
            },
            phone_number: "+254700000001".to_string(),
        }
    }

    #[tokio::test]
    async fn party_creation_requires_superuser() {
        let svc = test_service().await;
        let manager = Identity::new("mgr", Role::Manager);

        let err = svc
            .create_salesperson(&manager, new_salesperson(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let root = superuser();
        svc.create_salesperson(&root, new_salesperson(1))
            .await
            .unwrap();
        assert_eq!(svc.list_salespersons(&root).await.unwrap().len(), 1);
    }
}
