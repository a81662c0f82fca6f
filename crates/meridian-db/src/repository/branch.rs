//! # Branch Repository
//!
//! Database operations for branches and the salesperson assignment ledger.
//!
//! ## Assignment Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  assign(sp, branch): one transaction                                    │
//! │                                                                         │
//! │  1. Load salesperson + user (recipient), branch (name for the email)   │
//! │  2. Load the latest ledger entry for the salesperson                    │
//! │  3. decide_assignment():                                                │
//! │     ├── no history        → open first entry                            │
//! │     ├── open, same branch → reject (AlreadyAssigned)                    │
//! │     ├── open, different   → terminate old entry, open new one           │
//! │     └── closed            → open new entry                              │
//! │  4. Queue notifications into the outbox (termination before assignment) │
//! │  5. Commit                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The partial unique index on open entries backstops the at-most-one-open
//! invariant: if two concurrent assigns race past the read, the second insert
//! fails and the whole transaction rolls back.

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::outbox;
use meridian_core::validation::{validate_email, validate_required};
use meridian_core::{
    decide_assignment, AssignmentAction, Branch, BranchAssignment, NotificationTemplate, User,
    MAX_SHORT_TEXT,
};

const ASSIGNMENT_COLUMNS: &str =
    "id, salesperson_id, branch_id, assignment_date, termination_date";

/// Repository for branch and assignment-ledger operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    /// Creates a new BranchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Creates a branch. The opening date is stamped at creation.
    pub async fn create_branch(&self, name: &str, phone: &str, email: &str) -> DbResult<Branch> {
        validate_required("name", name, MAX_SHORT_TEXT).map_err(meridian_core::CoreError::from)?;
        validate_email(email).map_err(meridian_core::CoreError::from)?;

        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            email: email.trim().to_string(),
            opening_date: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO branches (id, name, phone, email, opening_date) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&branch.id)
        .bind(&branch.name)
        .bind(&branch.phone)
        .bind(&branch.email)
        .bind(branch.opening_date)
        .execute(&self.pool)
        .await?;

        debug!(id = %branch.id, name = %branch.name, "Created branch");
        Ok(branch)
    }

    /// Gets a branch by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, phone, email, opening_date FROM branches WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Lists all branches.
    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, Branch>(
            "SELECT id, name, phone, email, opening_date FROM branches ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Assignment Ledger
    // =========================================================================

    /// Assigns a salesperson to a branch.
    ///
    /// Runs the whole read-decide-write in one transaction, terminating any
    /// open assignment to a different branch first. Notifications commit with
    /// the ledger rows.
    ///
    /// ## Errors
    /// * `Domain(AlreadyAssigned)` - already openly assigned to this branch
    /// * `NotFound` - unknown salesperson or branch
    pub async fn assign(
        &self,
        salesperson_id: &str,
        branch_id: &str,
    ) -> DbResult<BranchAssignment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Recipient of the notifications
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
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("SalesPerson", salesperson_id))?;

        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, phone, email, opening_date FROM branches WHERE id = ?1",
        )
        .bind(branch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Branch", branch_id))?;

        let latest = sqlx::query_as::<_, BranchAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM branch_assignments
            WHERE salesperson_id = ?1
            ORDER BY assignment_date DESC, rowid DESC
            LIMIT 1
            "#
        ))
        .bind(salesperson_id)
        .fetch_optional(&mut *tx)
        .await?;

        let action = decide_assignment(latest.as_ref(), branch_id)?;

        if let AssignmentAction::TerminateAndReassign = action {
            // decide_assignment only returns this when an open entry exists
            let open = latest.as_ref().ok_or_else(|| {
                DbError::Internal("terminate requested without an open assignment".to_string())
            })?;

            sqlx::query("UPDATE branch_assignments SET termination_date = ?1 WHERE id = ?2")
                .bind(now)
                .bind(&open.id)
                .execute(&mut *tx)
                .await?;

            let old_branch_name: String =
                sqlx::query_scalar("SELECT name FROM branches WHERE id = ?1")
                    .bind(&open.branch_id)
                    .fetch_one(&mut *tx)
                    .await?;

            outbox::queue_entry(
                &mut tx,
                NotificationTemplate::Termination,
                &user.email,
                &json!({
                    "salesperson_name": user.full_name(),
                    "date": now.to_rfc3339(),
                    "branch_name": old_branch_name,
                }),
            )
            .await?;

            info!(
                salesperson_id = %salesperson_id,
                old_branch = %open.branch_id,
                new_branch = %branch_id,
                "Terminating assignment for reassignment"
            );
        }

        let assignment = BranchAssignment {
            id: Uuid::new_v4().to_string(),
            salesperson_id: salesperson_id.to_string(),
            branch_id: branch_id.to_string(),
            assignment_date: now,
            termination_date: None,
        };

        sqlx::query(
            r#"
            INSERT INTO branch_assignments (id, salesperson_id, branch_id, assignment_date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&assignment.id)
        .bind(&assignment.salesperson_id)
        .bind(&assignment.branch_id)
        .bind(assignment.assignment_date)
        .execute(&mut *tx)
        .await?;

        outbox::queue_entry(
            &mut tx,
            NotificationTemplate::Assignment,
            &user.email,
            &json!({
                "salesperson_name": user.full_name(),
                "date": now.to_rfc3339(),
                "branch_name": branch.name,
            }),
        )
        .await?;

        tx.commit().await?;

        info!(
            salesperson_id = %salesperson_id,
            branch_id = %branch_id,
            assignment_id = %assignment.id,
            "Salesperson assigned to branch"
        );
        Ok(assignment)
    }

    /// Gets the latest ledger entry for a salesperson, open or closed.
    pub async fn latest_assignment(
        &self,
        salesperson_id: &str,
    ) -> DbResult<Option<BranchAssignment>> {
        let entry = sqlx::query_as::<_, BranchAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM branch_assignments
            WHERE salesperson_id = ?1
            ORDER BY assignment_date DESC, rowid DESC
            LIMIT 1
            "#
        ))
        .bind(salesperson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets the branch of the salesperson's open assignment, if any.
    pub async fn active_branch(&self, salesperson_id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT b.id, b.name, b.phone, b.email, b.opening_date
            FROM branches b
            JOIN branch_assignments ba ON ba.branch_id = b.id
            WHERE ba.salesperson_id = ?1 AND ba.termination_date IS NULL
            "#,
        )
        .bind(salesperson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Full assignment history for a salesperson, newest first.
    pub async fn history(&self, salesperson_id: &str) -> DbResult<Vec<BranchAssignment>> {
        let rows = sqlx::query_as::<_, BranchAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM branch_assignments
            WHERE salesperson_id = ?1
            ORDER BY assignment_date DESC, rowid DESC
            "#
        ))
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
    use crate::repository::testutil::{seed_branch, seed_salesperson, test_db};
    use meridian_core::CoreError;

    #[tokio::test]
    async fn first_assignment_opens_entry_and_queues_notification() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;

        let entry = db.branches().assign(&sp.id, &branch.id).await.unwrap();
        assert!(entry.is_open());
        assert_eq!(entry.branch_id, branch.id);

        let active = db.branches().active_branch(&sp.id).await.unwrap().unwrap();
        assert_eq!(active.id, branch.id);

        let pending = db.outbox().get_pending(3, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].template, NotificationTemplate::Assignment);
        assert!(pending[0].context.contains("Westlands"));
        assert!(pending[0].context.contains("First1 Last1"));
    }

    #[tokio::test]
    async fn reassignment_terminates_old_entry() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let west = seed_branch(&db, "Westlands").await;
        let east = seed_branch(&db, "Eastleigh").await;
        let branches = db.branches();

        branches.assign(&sp.id, &west.id).await.unwrap();
        branches.assign(&sp.id, &east.id).await.unwrap();

        let history = branches.history(&sp.id).await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first: open entry for the new branch, closed for the old
        assert_eq!(history[0].branch_id, east.id);
        assert!(history[0].is_open());
        assert_eq!(history[1].branch_id, west.id);
        assert!(!history[1].is_open());

        // Termination notification precedes the new assignment notification
        let pending = db.outbox().get_pending(3, 10).await.unwrap();
        let templates: Vec<_> = pending.iter().map(|e| e.template).collect();
        assert_eq!(
            templates,
            vec![
                NotificationTemplate::Assignment,  // first assign
                NotificationTemplate::Termination, // reassign: old branch closed
                NotificationTemplate::Assignment,  // reassign: new branch opened
            ]
        );
        assert!(pending[1].context.contains("Westlands"));
        assert!(pending[2].context.contains("Eastleigh"));
    }

    #[tokio::test]
    async fn repeat_assignment_to_same_branch_is_rejected_without_side_effects() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        let branches = db.branches();

        branches.assign(&sp.id, &branch.id).await.unwrap();
        let err = branches.assign(&sp.id, &branch.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyAssigned { .. })
        ));

        // Ledger and outbox untouched by the rejected call
        assert_eq!(branches.history(&sp.id).await.unwrap().len(), 1);
        assert_eq!(db.outbox().get_pending(3, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reassignment_to_previous_branch_after_termination_opens_new_entry() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let west = seed_branch(&db, "Westlands").await;
        let east = seed_branch(&db, "Eastleigh").await;
        let branches = db.branches();

        branches.assign(&sp.id, &west.id).await.unwrap();
        branches.assign(&sp.id, &east.id).await.unwrap();
        // Back to the first branch: allowed, history keeps all three entries
        branches.assign(&sp.id, &west.id).await.unwrap();

        let history = branches.history(&sp.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.iter().filter(|e| e.is_open()).count(),
            1,
            "exactly one open entry"
        );
        assert_eq!(history[0].branch_id, west.id);
    }

    #[tokio::test]
    async fn assign_unknown_salesperson_or_branch_fails() {
        let db = test_db().await;
        let sp = seed_salesperson(&db, 1).await;
        let branch = seed_branch(&db, "Westlands").await;
        let branches = db.branches();

        assert!(matches!(
            branches.assign("missing", &branch.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            branches.assign(&sp.id, "missing").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
