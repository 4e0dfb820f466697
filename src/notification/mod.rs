pub mod dispatcher;
pub mod telegram;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::logging::LogContext;

pub use dispatcher::{format_deposit_message, DispatchSummary, NotificationDispatcher, STARTUP_MESSAGE};
pub use telegram::TelegramNotifier;

/// Outbound text channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotificationError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotificationError> {
        LogContext::new("notifier", "log_only").info(text);
        Ok(())
    }
}
