use serde_json::json;
use std::sync::Arc;

use crate::logging::LogContext;
use crate::models::DecodedDeposit;
use crate::notification::Notifier;

/// Sent once when the tracker comes up
pub const STARTUP_MESSAGE: &str = "ETH Deposit Tracker Starting: - ";

/// Outcome of dispatching a batch of deposits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

pub fn format_deposit_message(deposit: &DecodedDeposit) -> String {
    format!(
        "Block Number: {}\nTransaction Hash: {}\nDeposit Amount: {}\n",
        deposit.block_number, deposit.transaction_hash, deposit.amount
    )
}

/// Best-effort delivery of deposit notifications.
///
/// A failed send is logged and dropped; it never reaches the caller and never
/// holds back the rest of the batch.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Returns whether the message went out
    pub async fn dispatch(&self, deposit: &DecodedDeposit) -> bool {
        let message = format_deposit_message(deposit);
        let context = LogContext::new("notification", "dispatch")
            .with_block_number(deposit.block_number)
            .with_transaction_hash(&deposit.transaction_hash)
            .with_amount(&deposit.amount);

        match self.notifier.send_message(&message).await {
            Ok(()) => {
                context.debug("Deposit notification sent");
                true
            }
            Err(e) => {
                context
                    .with_metadata("error_kind", json!(e.kind()))
                    .error(&e.to_string());
                false
            }
        }
    }

    /// Notify in input order, one at a time
    pub async fn dispatch_all(&self, deposits: &[DecodedDeposit]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for deposit in deposits {
            if self.dispatch(deposit).await {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
        }

        if summary.failed > 0 {
            LogContext::new("notification", "dispatch_all")
                .with_metadata("sent", json!(summary.sent))
                .with_metadata("failed", json!(summary.failed))
                .warn(&format!(
                    "{} of {} deposit notifications were not delivered",
                    summary.failed,
                    summary.total()
                ));
        }

        summary
    }

    pub async fn send_startup(&self) -> bool {
        match self.notifier.send_message(STARTUP_MESSAGE).await {
            Ok(()) => true,
            Err(e) => {
                LogContext::new("notification", "startup")
                    .with_metadata("error_kind", json!(e.kind()))
                    .error(&e.to_string());
                false
            }
        }
    }
}
