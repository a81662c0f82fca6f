//! # Branch Operations
//!
//! Branch administration and the assignment ledger. Administration is
//! superuser-only; a salesperson may read their own ledger.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::Service;
use meridian_core::{Branch, BranchAssignment, Identity};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub assignment_id: String,
    pub salesperson_id: String,
    pub branch_id: String,
    pub assignment_date: chrono::DateTime<chrono::Utc>,
}

impl From<BranchAssignment> for AssignmentResponse {
    fn from(a: BranchAssignment) -> Self {
        AssignmentResponse {
            assignment_id: a.id,
            salesperson_id: a.salesperson_id,
            branch_id: a.branch_id,
            assignment_date: a.assignment_date,
        }
    }
}

impl Service {
    /// Creates a branch. Superuser only.
    pub async fn create_branch(
        &self,
        identity: &Identity,
        name: &str,
        phone: &str,
        email: &str,
    ) -> ApiResult<Branch> {
        identity.require_superuser()?;
        debug!(caller = %identity.user_id, name, "create_branch");

        Ok(self.db().branches().create_branch(name, phone, email).await?)
    }

    /// Lists all branches.
    pub async fn list_branches(&self, _identity: &Identity) -> ApiResult<Vec<Branch>> {
        Ok(self.db().branches().list().await?)
    }

    /// Assigns a salesperson to a branch, terminating any open assignment to
    /// a different branch. Superuser only.
    pub async fn assign_branch(
        &self,
        identity: &Identity,
        salesperson_id: &str,
        branch_id: &str,
    ) -> ApiResult<AssignmentResponse> {
        identity.require_superuser()?;
        debug!(caller = %identity.user_id, salesperson_id, branch_id, "assign_branch");

        let assignment = self.db().branches().assign(salesperson_id, branch_id).await?;
        Ok(assignment.into())
    }

    /// Full assignment history for a salesperson, newest first. Readable by
    /// the salesperson themself or a superuser.
    pub async fn branch_history(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<Vec<BranchAssignment>> {
        let user = self.db().parties().salesperson_user(salesperson_id).await?;
        identity.require_salesperson(&user.id)?;

        Ok(self.db().branches().history(salesperson_id).await?)
    }

    /// The branch of the salesperson's open assignment, if any.
    pub async fn active_branch(
        &self,
        identity: &Identity,
        salesperson_id: &str,
    ) -> ApiResult<Option<Branch>> {
        let user = self.db().parties().salesperson_user(salesperson_id).await?;
        identity.require_salesperson(&user.id)?;

        Ok(self.db().branches().active_branch(salesperson_id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
