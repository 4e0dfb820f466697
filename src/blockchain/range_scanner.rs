use std::sync::Arc;

use crate::blockchain::ledger::{LedgerClient, LogFilter};
use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{RawLog, ScanRange};
use crate::retry::{RetryConfig, RetryManager};

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanBatch {
    /// `None` when the cursor was already past the chain tip
    pub range: Option<ScanRange>,
    pub events: Vec<RawLog>,
    pub next_cursor: u64,
}

impl ScanBatch {
    pub fn has_new_blocks(&self) -> bool {
        self.range.is_some()
    }
}

/// Fetches the contract's logs one window at a time
pub struct RangeScanner {
    ledger: Arc<dyn LedgerClient>,
    contract_address: String,
    window_size: u64,
    retry: RetryManager,
}

impl RangeScanner {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        contract_address: String,
        window_size: u64,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            ledger,
            contract_address,
            window_size: window_size.max(1),
            retry: RetryManager::new("get_logs", retry_config),
        }
    }

    pub fn from_config(ledger: Arc<dyn LedgerClient>, config: &ScannerConfig) -> Self {
        Self::new(
            ledger,
            config.contract_address.clone(),
            config.window_size,
            config.retry_config(),
        )
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    /// Scan `[cursor, min(cursor + window - 1, latest)]`.
    ///
    /// When the fetch fails the cursor must stay where it is, so the caller
    /// gets an error instead of a batch and the same range is asked for again.
    pub async fn scan(&self, cursor: u64, latest: u64) -> Result<ScanBatch, ScanError> {
        let range = match ScanRange::next(cursor, latest, self.window_size) {
            Some(range) => range,
            None => {
                return Ok(ScanBatch {
                    range: None,
                    events: Vec::new(),
                    next_cursor: cursor,
                })
            }
        };

        let filter = LogFilter::for_range(&self.contract_address, &range);
        LogContext::new("range_scanner", "scan")
            .with_range(&range)
            .with_metadata("address", serde_json::json!(self.contract_address))
            .info(&format!("Fetching logs from block {} to {}", range.from, range.to));

        let monitor = PerformanceMonitor::new("scan_range");
        let ledger = self.ledger.as_ref();
        let filter = &filter;
        let events = self
            .retry
            .execute(move || ledger.get_logs(filter))
            .await
            .map_err(|source| ScanError::Exhausted { range, source })?;

        MetricsLogger::log_range_scanned(&range, events.len(), monitor.elapsed_ms());

        Ok(ScanBatch {
            range: Some(range),
            events,
            next_cursor: range.next_cursor(),
        })
    }
}
