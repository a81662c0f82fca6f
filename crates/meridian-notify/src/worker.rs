//! # Outbox Worker
//!
//! Background loop draining the notification outbox.
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Worker Flow                                    │
//! │                                                                         │
//! │  1. Poll: pending entries (sent_at IS NULL, attempts < max)             │
//! │           oldest first, batch-limited                                   │
//! │                                                                         │
//! │  2. Deliver: Notifier::notify() per entry                               │
//! │                                                                         │
//! │  3. Mark: mark_sent() on success                                        │
//! │           mark_failed() on error (attempts += 1, last_error recorded)   │
//! │                                                                         │
//! │  TIMING:                                                                │
//! │  • Poll interval: 5 seconds (configurable)                              │
//! │  • Batch size: 100 entries (configurable)                               │
//! │  • Max attempts: 10 (then parked with last_error)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at-least-once: a crash after notify() but before mark_sent()
//! re-delivers on the next poll. Recipients tolerate a duplicate email; they
//! would not tolerate a lost termination notice.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::notifier::Notifier;
use meridian_db::Database;

// =============================================================================
// Configuration
// =============================================================================

/// Worker tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to poll the outbox.
    pub poll_interval: Duration,

    /// Maximum entries fetched per poll.
    pub batch_size: i64,

    /// Attempts before an entry is parked for manual inspection.
    pub max_attempts: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 10,
        }
    }
}

// =============================================================================
// Outbox Worker
// =============================================================================

/// Drains the notification outbox through a [`Notifier`] backend.
pub struct OutboxWorker {
    /// Database connection.
    db: Arc<Database>,

    /// Delivery backend.
    notifier: Arc<dyn Notifier>,

    /// Worker configuration.
    config: WorkerConfig,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the outbox worker.
#[derive(Clone)]
pub struct OutboxWorkerHandle {
    /// Shutdown sender.
    shutdown_tx: mpsc::Sender<()>,
}

impl OutboxWorkerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> NotifyResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| NotifyError::DeliveryFailed("Shutdown channel closed".into()))
    }
}

impl OutboxWorker {
    /// Creates a new outbox worker and returns a handle.
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        config: WorkerConfig,
    ) -> (Self, OutboxWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = OutboxWorker {
            db,
            notifier,
            config,
            shutdown_rx,
        };

        let handle = OutboxWorkerHandle { shutdown_tx };

        (worker, handle)
    }

    /// Runs the worker loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Outbox worker starting");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain_once().await {
                        error!(?e, "Failed to process outbox batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Outbox worker shutting down");
                    break;
                }
            }
        }

        info!("Outbox worker stopped");
    }

    /// Processes one batch of pending entries. Returns how many delivered.
    pub async fn drain_once(&self) -> NotifyResult<usize> {
        let entries = self
            .db
            .outbox()
            .get_pending(self.config.max_attempts, self.config.batch_size)
            .await?;

        if entries.is_empty() {
            debug!("No pending notifications");
            return Ok(0);
        }

        info!(count = entries.len(), "Processing notification batch");

        let mut delivered = 0;
        for entry in entries {
            let context: serde_json::Value = match serde_json::from_str(&entry.context) {
                Ok(value) => value,
                Err(e) => {
                    // Unparseable context never heals: record and count down
                    // its attempts like any other failure
                    warn!(id = %entry.id, ?e, "Corrupt notification context");
                    self.db
                        .outbox()
                        .mark_failed(&entry.id, &format!("corrupt context: {e}"))
                        .await?;
                    continue;
                }
            };

            match self
                .notifier
                .notify(entry.template, &entry.recipient, &context)
                .await
            {
                Ok(()) => {
                    self.db.outbox().mark_sent(&entry.id).await?;
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        id = %entry.id,
                        recipient = %entry.recipient,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "Notification delivery failed"
                    );
                    self.db.outbox().mark_failed(&entry.id, &e.to_string()).await?;
                }
            }
        }

        debug!(delivered, "Notification batch processed");
        Ok(delivered)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::RecordingNotifier;
    use meridian_core::NotificationTemplate;
    use meridian_db::{DbConfig, NewSalesPerson, NewUser};

    async fn seeded_db() -> (Arc<Database>, String) {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let sp = db
            .parties()
            .create_salesperson(NewSalesPerson {
                user: NewUser {
                    username: "jane".to_string(),
                    first_name: "Jane".to_string(),
                    last_name: "Doe".to_string(),
                    email: "jane@example.com".to_string(),
                },
                phone_number: "+254700000001".to_string(),
            })
            .await
            .unwrap();
        (db, sp.id)
    }

    #[tokio::test]
    async fn drains_queued_notifications_in_order() {
        let (db, sp_id) = seeded_db().await;
        let west = db
            .branches()
            .create_branch("Westlands", "p", "west@example.com")
            .await
            .unwrap();
        let east = db
            .branches()
            .create_branch("Eastleigh", "p", "east@example.com")
            .await
            .unwrap();

        // assign + reassign → assignment, termination, assignment
        db.branches().assign(&sp_id, &west.id).await.unwrap();
        db.branches().assign(&sp_id, &east.id).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let (worker, _handle) =
            OutboxWorker::new(db.clone(), notifier.clone(), WorkerConfig::default());

        let delivered = worker.drain_once().await.unwrap();
        assert_eq!(delivered, 3);

        let log = notifier.delivered.lock().unwrap();
        let templates: Vec<_> = log.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            templates,
            vec![
                NotificationTemplate::Assignment,
                NotificationTemplate::Termination,
                NotificationTemplate::Assignment,
            ]
        );
        assert!(log.iter().all(|(_, r)| r == "jane@example.com"));
        drop(log);

        // Nothing left pending, second drain is a no-op
        assert_eq!(worker.drain_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_on_next_drain() {
        let (db, sp_id) = seeded_db().await;
        let branch = db
            .branches()
            .create_branch("Westlands", "p", "west@example.com")
            .await
            .unwrap();
        db.branches().assign(&sp_id, &branch.id).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::failing_first(1));
        let (worker, _handle) =
            OutboxWorker::new(db.clone(), notifier.clone(), WorkerConfig::default());

        assert_eq!(worker.drain_once().await.unwrap(), 0);
        let pending = db.outbox().get_pending(10, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.is_some());

        assert_eq!(worker.drain_once().await.unwrap(), 1);
        assert!(db.outbox().get_pending(10, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_entries_are_parked() {
        let (db, sp_id) = seeded_db().await;
        let branch = db
            .branches()
            .create_branch("Westlands", "p", "west@example.com")
            .await
            .unwrap();
        db.branches().assign(&sp_id, &branch.id).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::failing_first(u32::MAX));
        let config = WorkerConfig {
            max_attempts: 2,
            ..WorkerConfig::default()
        };
        let (worker, _handle) = OutboxWorker::new(db.clone(), notifier, config);

        assert_eq!(worker.drain_once().await.unwrap(), 0);
        assert_eq!(worker.drain_once().await.unwrap(), 0);

        // Two failed attempts under max_attempts = 2: parked, no longer polled
        assert_eq!(worker.drain_once().await.unwrap(), 0);
        assert!(db.outbox().get_pending(2, 10).await.unwrap().is_empty());

        let all = db.outbox().get_pending(10, 10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].attempts, 2);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (db, _sp_id) = seeded_db().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let (worker, handle) = OutboxWorker::new(db, notifier, WorkerConfig::default());

        let task = tokio::spawn(worker.run());
        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
