use log::{debug, info};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::blockchain::deposit_decoder;
use crate::blockchain::ledger::LedgerClient;
use crate::blockchain::range_scanner::RangeScanner;
use crate::config::MonitorConfig;
use crate::error::{RpcError, TickError, TrackerError};
use crate::logging::{ErrorLogger, LogContext};
use crate::metrics::MetricsSink;
use crate::models::{Cursor, DecodedDeposit, ScanRange};
use crate::notification::{DispatchSummary, NotificationDispatcher};

/// What a successful tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The cursor was already past the chain tip
    NoNewBlocks { latest: u64 },
    Scanned {
        range: ScanRange,
        deposits: usize,
        notifications: DispatchSummary,
    },
}

/// Drives the tracker: one tick per iteration, forever, until shutdown.
pub struct DepositMonitor {
    ledger: Arc<dyn LedgerClient>,
    scanner: RangeScanner,
    dispatcher: NotificationDispatcher,
    metrics: Arc<dyn MetricsSink>,
    pub config: MonitorConfig,
    cursor: Cursor,
    pub shutdown_signal: Arc<AtomicBool>,
}

impl DepositMonitor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        scanner: RangeScanner,
        dispatcher: NotificationDispatcher,
        metrics: Arc<dyn MetricsSink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            ledger,
            scanner,
            dispatcher,
            metrics,
            config,
            cursor: Cursor::new(0),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start tracking at `next_block` instead of the current chain height
    pub fn with_cursor(mut self, next_block: u64) -> Self {
        self.cursor = Cursor::new(next_block);
        self
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.next_block()
    }

    /// Probe the ledger, place the cursor at the current height and announce
    /// the start. Any failure here is fatal.
    pub async fn bootstrap(&mut self) -> Result<(), TrackerError> {
        if !self.ledger.is_connected().await {
            return Err(RpcError::Connection("ledger endpoint is not reachable".to_string()).into());
        }

        let latest = self.ledger.latest_block_number().await?;
        self.cursor = Cursor::new(latest);

        // Exported at zero from the first push on, before any deposit is seen
        self.metrics.add_to_counter(&self.config.deposits_counter, 0);

        LogContext::new("deposit_monitor", "bootstrap")
            .with_block_number(latest)
            .info(&format!("Connected to ledger, tracking from block {}", latest));

        self.dispatcher.send_startup().await;
        Ok(())
    }

    /// One Idle -> Scanning pass. Does not sleep.
    pub async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        let latest = self
            .ledger
            .latest_block_number()
            .await
            .map_err(TickError::LatestHeight)?;

        let batch = self.scanner.scan(self.cursor.next_block(), latest).await?;
        let range = match batch.range {
            Some(range) => range,
            None => {
                debug!("No new blocks, cursor {} is past tip {}", self.cursor.next_block(), latest);
                return Ok(TickOutcome::NoNewBlocks { latest });
            }
        };

        let deposits: Vec<DecodedDeposit> = batch.events.iter().map(deposit_decoder::decode).collect();
        let notifications = self.dispatcher.dispatch_all(&deposits).await;

        if !deposits.is_empty() {
            self.metrics
                .add_to_counter(&self.config.deposits_counter, deposits.len() as u64);
        }

        self.cursor.advance_to(batch.next_cursor);

        Ok(TickOutcome::Scanned {
            range,
            deposits: deposits.len(),
            notifications,
        })
    }

    /// How long to wait after a tick
    pub fn settle_delay(&self, outcome: &Result<TickOutcome, TickError>) -> Duration {
        match outcome {
            Ok(TickOutcome::NoNewBlocks { .. }) => self.config.idle_delay(),
            Ok(TickOutcome::Scanned { .. }) => self.config.tick_delay(),
            Err(_) => self.config.failure_delay(),
        }
    }

    /// Tick, log whatever went wrong, then wait out the settle delay
    pub async fn run_iteration(&mut self) -> Result<TickOutcome, TickError> {
        let outcome = self.tick().await;
        let delay = self.settle_delay(&outcome);

        match &outcome {
            Ok(TickOutcome::Scanned { range, deposits, .. }) => {
                debug!(
                    "Scanned blocks {}..={} ({} deposits), next block {}",
                    range.from,
                    range.to,
                    deposits,
                    self.cursor.next_block()
                );
            }
            Ok(TickOutcome::NoNewBlocks { .. }) => {}
            Err(e) => {
                let context = LogContext::new("deposit_monitor", "tick")
                    .with_block_number(self.cursor.next_block())
                    .with_metadata("retry_in_seconds", json!(delay.as_secs()));
                ErrorLogger::log_tick_error(e, Some(context));
            }
        }

        sleep(delay).await;
        outcome
    }

    /// Run ticks until shutdown is requested
    pub async fn run(&mut self) {
        info!(
            "Deposit monitor running from block {} (window {})",
            self.cursor.next_block(),
            self.scanner.window_size()
        );

        while !self.shutdown_signal.load(Ordering::SeqCst) {
            let _ = self.run_iteration().await;
        }

        info!("Deposit monitor stopped at block {}", self.cursor.next_block());
    }

    /// Request graceful shutdown
    pub fn shutdown(&self) {
        info!("Requesting graceful shutdown");
        self.shutdown_signal.store(true, Ordering::SeqCst);
    }
}
