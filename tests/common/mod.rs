#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eth_deposit_tracker::blockchain::{DepositMonitor, LedgerClient, LogFilter, RangeScanner};
use eth_deposit_tracker::config::{MonitorConfig, BEACON_DEPOSIT_CONTRACT};
use eth_deposit_tracker::error::{NotificationError, RpcError};
use eth_deposit_tracker::metrics::MetricsSink;
use eth_deposit_tracker::models::RawLog;
use eth_deposit_tracker::notification::{NotificationDispatcher, Notifier};
use eth_deposit_tracker::retry::RetryConfig;

/// Scripted in-memory ledger
#[derive(Default)]
pub struct MockLedger {
    pub disconnected: AtomicBool,
    pub height: AtomicU64,
    /// Number of upcoming height queries that fail
    pub height_failures: AtomicU32,
    /// Number of upcoming log fetches that fail
    pub get_logs_failures: AtomicU32,
    pub logs: Mutex<Vec<RawLog>>,
    pub height_calls: AtomicU32,
    pub get_logs_calls: AtomicU32,
    pub filters: Mutex<Vec<LogFilter>>,
}

impl MockLedger {
    pub fn at_height(height: u64) -> Self {
        let ledger = Self::default();
        ledger.height.store(height, Ordering::SeqCst);
        ledger
    }

    pub fn with_logs(self, logs: Vec<RawLog>) -> Self {
        *self.logs.lock().unwrap() = logs;
        self
    }

    pub fn height_calls(&self) -> u32 {
        self.height_calls.load(Ordering::SeqCst)
    }

    pub fn get_logs_calls(&self) -> u32 {
        self.get_logs_calls.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<LogFilter> {
        self.filters.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn parse_block(hex_block: &str) -> u64 {
    u64::from_str_radix(hex_block.trim_start_matches("0x"), 16).unwrap()
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.height_failures) {
            return Err(RpcError::Status { status: 503 });
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError> {
        self.get_logs_calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().unwrap().push(filter.clone());
        if Self::take_failure(&self.get_logs_failures) {
            return Err(RpcError::Connection("connection reset by peer".to_string()));
        }

        let from = parse_block(&filter.from_block);
        let to = parse_block(&filter.to_block);
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.block_number >= from && log.block_number <= to)
            .cloned()
            .collect())
    }
}

/// Records every message; the 1-based call numbers in `fail_on` fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail_on: Vec<usize>,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotificationError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(text.to_string());
        if self.fail_on.contains(&messages.len()) {
            return Err(NotificationError::Http {
                status: 429,
                body: "Too Many Requests".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub increments: Mutex<Vec<(String, u64)>>,
}

impl RecordingMetrics {
    pub fn increments(&self) -> Vec<(String, u64)> {
        self.increments.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn add_to_counter(&self, name: &str, delta: u64) {
        self.increments.lock().unwrap().push((name.to_string(), delta));
    }
}

pub fn deposit_log(block_number: u64, log_index: u32, data: Vec<u8>) -> RawLog {
    RawLog {
        address: BEACON_DEPOSIT_CONTRACT.to_lowercase(),
        topics: vec![
            "0x649bbc62d0e31342afea4e5cd82d4049e7e1ee912fc0889aa790803be39038c5".to_string(),
        ],
        data,
        block_number,
        transaction_hash: format!("0x{:060x}{:04x}", block_number, log_index),
        log_index,
    }
}

pub fn test_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        base_delay: Duration::from_secs(1),
    }
}

pub fn build_monitor(
    ledger: &Arc<MockLedger>,
    notifier: &Arc<RecordingNotifier>,
    metrics: &Arc<RecordingMetrics>,
    cursor: u64,
) -> DepositMonitor {
    let scanner = RangeScanner::new(
        ledger.clone(),
        BEACON_DEPOSIT_CONTRACT.to_string(),
        1000,
        test_retry_config(),
    );
    DepositMonitor::new(
        ledger.clone(),
        scanner,
        NotificationDispatcher::new(notifier.clone()),
        metrics.clone(),
        MonitorConfig::default(),
    )
    .with_cursor(cursor)
}
