//! # Notifier Trait & Message Rendering
//!
//! Delivery backends implement [`Notifier`]; the worker stays ignorant of the
//! transport. [`LogNotifier`] writes rendered messages to the log and is the
//! default backend until a mail provider is wired in.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::error::{NotifyError, NotifyResult};
use meridian_core::NotificationTemplate;

/// Context fields the ledger templates carry. Stored as JSON in the outbox.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerContext {
    pub salesperson_name: String,
    pub date: String,
    pub branch_name: String,
}

impl LedgerContext {
    /// Parses a stored outbox context.
    pub fn parse(context: &serde_json::Value) -> NotifyResult<Self> {
        serde_json::from_value(context.clone())
            .map_err(|e| NotifyError::BadContext(e.to_string()))
    }
}

/// Renders the subject line for a template.
pub fn render_subject(template: NotificationTemplate) -> &'static str {
    match template {
        NotificationTemplate::Assignment => "Branch Assignment",
        NotificationTemplate::Termination => "Branch Assignment Terminated",
    }
}

/// Renders the message body for a template and context.
pub fn render_body(template: NotificationTemplate, ctx: &LedgerContext) -> String {
    match template {
        NotificationTemplate::Assignment => format!(
            "Dear {}, this is to notify you that as of {} you are attached to our {} branch. \
             Please report to the branch manager on your next working day.",
            ctx.salesperson_name, ctx.date, ctx.branch_name
        ),
        NotificationTemplate::Termination => format!(
            "Dear {}, this is to notify you that as of {} your attachment to our {} branch \
             has ended. Any pending handover should be completed with the branch manager.",
            ctx.salesperson_name, ctx.date, ctx.branch_name
        ),
    }
}

/// A notification delivery backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Errors are recorded on the outbox entry
    /// and retried by the worker.
    async fn notify(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        context: &serde_json::Value,
    ) -> NotifyResult<()>;
}

/// Delivery backend that writes rendered messages to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        template: NotificationTemplate,
        recipient: &str,
        context: &serde_json::Value,
    ) -> NotifyResult<()> {
        let ctx = LedgerContext::parse(context)?;
        info!(
            recipient = %recipient,
            subject = render_subject(template),
            body = %render_body(template, &ctx),
            "Notification delivered (log backend)"
        );
        Ok(())
    }
}


// =============================================================================
// Unit Tests
// =============================================================================
