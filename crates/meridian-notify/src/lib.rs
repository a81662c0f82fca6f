//! # meridian-notify: Notification Delivery for Meridian
//!
//! Drains the notification outbox written by meridian-db and delivers
//! messages through a pluggable [`Notifier`] backend.
//!
//! ## Architecture Position
//! ```text
//! meridian-db ──queues──► notification_outbox table
//!                               │
//!                               ▼
//!                    meridian-notify (THIS CRATE)
//!                      OutboxWorker ──► Notifier (log, mail, ...)
//! ```
//!
//! The outbox pattern decouples ledger transactions from delivery: queueing
//! commits with the mutation, delivery happens afterwards with retries, and a
//! rolled-back mutation never produces a notification.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_notify::{LogNotifier, OutboxWorker, WorkerConfig};
//!
//! let (worker, handle) = OutboxWorker::new(db, Arc::new(LogNotifier), WorkerConfig::default());
//! tokio::spawn(worker.run());
//! // ... on shutdown:
//! handle.shutdown().await?;
//! ```

pub mod error;
pub mod notifier;
pub mod worker;

pub use error::{NotifyError, NotifyResult};
pub use notifier::{render_body, render_subject, LedgerContext, LogNotifier, Notifier};
pub use worker::{OutboxWorker, OutboxWorkerHandle, WorkerConfig};
