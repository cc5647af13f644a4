//! Notify Module - Outbound alert delivery
//!
//! - `dispatcher.rs` - bounded queue + worker thread, never blocks the engine
//! - `webhook.rs` - Slack / Discord / generic JSON webhooks
//!
//! Delivery is fire-and-forget: failures are logged by the dispatcher and
//! never reach the pipeline.

pub mod dispatcher;
pub mod webhook;

use thiserror::Error;

use crate::logic::alert::{AlertEvent, AlertLevel};

pub use dispatcher::NotificationDispatcher;
pub use webhook::{WebhookConfig, WebhookNotifier, WebhookPlatform};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotifyError {
    #[error("network error: {0}")]
    Network(String),

    #[error("endpoint rejected alert with HTTP {status}")]
    Rejected { status: u16 },

    #[error("cannot format alert: {0}")]
    Format(String),
}

pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError>;
}

/// Writes every transition to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        match event.new_level {
            AlertLevel::Critical => log::error!("{} {} [{}]", event.new_level.emoji(), event.summary(), event.id),
            AlertLevel::Warning => log::warn!("{} {} [{}]", event.new_level.emoji(), event.summary(), event.id),
            AlertLevel::Normal => log::info!("{} {} [{}]", event.new_level.emoji(), event.summary(), event.id),
        }
        Ok(())
    }
}
