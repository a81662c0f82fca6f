//! # Access Control
//!
//! Caller identity threaded explicitly into every operation.
//!
//! The auth collaborator resolves credentials to an [`Identity`] before any
//! core call; the core trusts it. There is no ambient "current user": every
//! service function takes the identity as a parameter, which keeps role
//! checks visible at the call site and testable without request machinery.

use crate::error::{CoreError, CoreResult};
use crate::types::Role;

/// The authenticated caller, as supplied by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Identity {
            user_id: user_id.into(),
            role,
        }
    }

    /// Superuser-only gate (party/branch administration).
    pub fn require_superuser(&self) -> CoreResult<()> {
        if self.role == Role::Superuser {
            Ok(())
        } else {
            Err(CoreError::forbidden("superuser role required"))
        }
    }

    /// Salesperson-or-superuser gate. Salespeople may only act as the user
    /// behind the targeted salesperson record.
    pub fn require_salesperson(&self, salesperson_user_id: &str) -> CoreResult<()> {
        match self.role {
            Role::Superuser => Ok(()),
            Role::Salesperson if self.user_id == salesperson_user_id => Ok(()),
            Role::Salesperson => Err(CoreError::forbidden(
                "salespersons may only operate on their own sales",
            )),
            _ => Err(CoreError::forbidden("salesperson role required")),
        }
    }

    /// Cart gate: any staff role, or the owning customer.
    pub fn require_cart_access(&self, owner_user_id: &str) -> CoreResult<()> {
        if self.role.is_staff() {
            return Ok(());
        }
        if self.role == Role::Customer && self.user_id == owner_user_id {
            return Ok(());
        }
        Err(CoreError::forbidden("not permitted to operate this cart"))
    }
}
