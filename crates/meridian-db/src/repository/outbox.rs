//! # Notification Outbox Repository
//!
//! Queue operations for the notification outbox.
//!
//! ## Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. QUEUE (inside the ledger transaction)                               │
//! │     └── queue_entry() → row with sent_at = NULL                         │
//! │                                                                         │
//! │  2. COMMIT → notification becomes visible exactly when the mutation does│
//! │                                                                         │
//! │  3. DRAIN (background worker, meridian-notify)                          │
//! │     └── get_pending() → deliver → mark_sent() / mark_failed()           │
//! │                                                                         │
//! │  4. CLEANUP (periodic)                                                  │
//! │     └── cleanup_sent() → delete delivered rows older than a cutoff      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at-least-once: a crash between delivery and `mark_sent` means
//! the entry is retried. Entries that exhaust their attempts stay in the
//! table with `last_error` set for manual inspection.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{NotificationOutboxEntry, NotificationTemplate};

const SELECT_COLUMNS: &str = "id, template, recipient, context, attempts, last_error, created_at, attempted_at, sent_at";

/// Queues a notification on an existing connection or transaction.
///
/// Called by the branch repository inside the assignment transaction so the
/// notification commits atomically with the ledger mutation.
pub(crate) async fn queue_entry(
    conn: &mut sqlx::SqliteConnection,
    template: NotificationTemplate,
    recipient: &str,
    context: &serde_json::Value,
) -> DbResult<NotificationOutboxEntry> {
    let entry = NotificationOutboxEntry {
        id: Uuid::new_v4().to_string(),
        template,
        recipient: recipient.to_string(),
        context: context.to_string(),
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        sent_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO notification_outbox (id, template, recipient, context, attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(&entry.id)
    .bind(entry.template)
    .bind(&entry.recipient)
    .bind(&entry.context)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    debug!(id = %entry.id, template = %entry.template, "Queued notification");
    Ok(entry)
}

/// Repository for notification outbox operations.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Queues a standalone notification (outside any ledger transaction).
    pub async fn queue(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        context: &serde_json::Value,
    ) -> DbResult<NotificationOutboxEntry> {
        let mut conn = self.pool.acquire().await?;
        queue_entry(&mut conn, template, recipient, context).await
    }

    /// Gets undelivered entries that still have attempts left, oldest first.
    pub async fn get_pending(
        &self,
        max_attempts: i64,
        limit: i64,
    ) -> DbResult<Vec<NotificationOutboxEntry>> {
        let entries = sqlx::query_as::<_, NotificationOutboxEntry>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM notification_outbox
            WHERE sent_at IS NULL AND attempts < ?1
            ORDER BY created_at ASC
            LIMIT ?2
            "#
        ))
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Gets an entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<NotificationOutboxEntry>> {
        let entry = sqlx::query_as::<_, NotificationOutboxEntry>(&format!(
            "SELECT {SELECT_COLUMNS} FROM notification_outbox WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Marks an entry as delivered.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE notification_outbox
            SET sent_at = ?1, attempted_at = ?1, attempts = attempts + 1, last_error = NULL
            WHERE id = ?2 AND sent_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        debug!(id = %id, "Notification marked sent");
        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE notification_outbox
            SET attempted_at = ?1, attempts = attempts + 1, last_error = ?2
            WHERE id = ?3 AND sent_at IS NULL
            "#,
        )
        .bind(now)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("NotificationOutboxEntry", id));
        }

        debug!(id = %id, error = %error, "Notification delivery failed");
        Ok(())
    }

    /// Deletes delivered entries older than the cutoff. Returns rows removed.
    pub async fn cleanup_sent(&self, older_than: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notification_outbox WHERE sent_at IS NOT NULL AND sent_at < ?1",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testutil::test_db;
    use serde_json::json;

    #[tokio::test]
    async fn queue_and_drain_lifecycle() {
        let db = test_db().await;
        let outbox = db.outbox();

        let entry = outbox
            .queue(
                NotificationTemplate::Assignment,
                "sp@example.com",
                &json!({"salesperson_name": "Jane Doe", "branch_name": "Westlands"}),
            )
            .await
            .unwrap();

        let pending = outbox.get_pending(3, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, entry.id);
        assert_eq!(pending[0].attempts, 0);

        outbox.mark_sent(&entry.id).await.unwrap();
        assert!(outbox.get_pending(3, 10).await.unwrap().is_empty());

        let sent = outbox.get_by_id(&entry.id).await.unwrap().unwrap();
        assert!(sent.sent_at.is_some());
        assert_eq!(sent.attempts, 1);
    }

    #[tokio::test]
    async fn failed_entries_retry_until_attempts_exhausted() {
        let db = test_db().await;
        let outbox = db.outbox();

        let entry = outbox
            .queue(NotificationTemplate::Termination, "sp@example.com", &json!({}))
            .await
            .unwrap();

        outbox.mark_failed(&entry.id, "smtp timeout").await.unwrap();
        outbox.mark_failed(&entry.id, "smtp timeout").await.unwrap();

        // Still pending under a cap of 3
        assert_eq!(outbox.get_pending(3, 10).await.unwrap().len(), 1);

        outbox.mark_failed(&entry.id, "smtp timeout").await.unwrap();

        // Exhausted: no longer returned, but the row survives for inspection
        assert!(outbox.get_pending(3, 10).await.unwrap().is_empty());
        let parked = outbox.get_by_id(&entry.id).await.unwrap().unwrap();
        assert_eq!(parked.attempts, 3);
        assert_eq!(parked.last_error.as_deref(), Some("smtp timeout"));
    }

    #[tokio::test]
    async fn pending_drains_oldest_first() {
        let db = test_db().await;
        let outbox = db.outbox();

        let first = outbox
            .queue(NotificationTemplate::Termination, "a@example.com", &json!({}))
            .await
            .unwrap();
        let second = outbox
            .queue(NotificationTemplate::Assignment, "a@example.com", &json!({}))
            .await
            .unwrap();

        let pending = outbox.get_pending(3, 10).await.unwrap();
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[tokio::test]
    async fn cleanup_removes_only_delivered_rows() {
        let db = test_db().await;
        let outbox = db.outbox();

        let sent = outbox
            .queue(NotificationTemplate::Assignment, "a@example.com", &json!({}))
            .await
            .unwrap();
        outbox
            .queue(NotificationTemplate::Assignment, "b@example.com", &json!({}))
            .await
            .unwrap();
        outbox.mark_sent(&sent.id).await.unwrap();

        let removed = outbox.cleanup_sent(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(outbox.get_pending(3, 10).await.unwrap().len(), 1);
    }
}
