use log::{debug, error, info, trace, warn, LevelFilter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, SystemError, TickError, TrackerError};
use crate::models::ScanRange;

/// Structured logging context for the tracker
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_range(self, range: &ScanRange) -> Self {
        self.with_metadata("from_block", json!(range.from))
            .with_metadata("to_block", json!(range.to))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Performance monitoring utilities
pub struct PerformanceMonitor {
    pub start_time: SystemTime,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: SystemTime::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_millis() as u64
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = self.elapsed_ms();

        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);

        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => {
                context.debug(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.warn(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &TrackerError, context: Option<LogContext>) {
        Self::log_with_severity(error, error.severity(), context);
    }

    /// Failed monitor iteration; the loop carries on after this
    pub fn log_tick_error(error: &TickError, context: Option<LogContext>) {
        Self::log_with_severity(error, error.severity(), context);
    }

    fn log_with_severity<E>(error: &E, severity: ErrorSeverity, context: Option<LogContext>)
    where
        E: std::fmt::Display + std::fmt::Debug,
    {
        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }

    pub fn log_retry_attempt(
        operation: &str,
        error: &dyn std::fmt::Display,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    ) {
        let context = LogContext::new("retry", operation)
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("delay_ms", json!(delay.as_millis() as u64));

        context.warn(&format!(
            "Request failed: {}. Retrying in {:.1} seconds (attempt {} of {})",
            error,
            delay.as_secs_f64(),
            attempt,
            max_attempts
        ));
    }

    pub fn log_retry_exhausted(operation: &str, error: &dyn std::fmt::Display, max_attempts: u32) {
        let context = LogContext::new("retry", operation)
            .with_metadata("max_attempts", json!(max_attempts));
        context.error(&format!("Max retries reached. Giving up: {}", error));
    }

    pub fn log_recovery_success(operation: &str, attempts: u32, total_duration_ms: u64) {
        let context = LogContext::new("recovery", "success")
            .with_metadata("operation", json!(operation))
            .with_retry_count(attempts)
            .with_duration_ms(total_duration_ms);

        context.info(&format!(
            "Operation recovered after {} attempts in {}ms",
            attempts, total_duration_ms
        ));
    }
}

/// Application metrics and monitoring
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_range_scanned(range: &ScanRange, event_count: usize, duration_ms: u64) {
        let context = LogContext::new("metrics", "range_scanned")
            .with_range(range)
            .with_metadata("event_count", json!(event_count))
            .with_duration_ms(duration_ms);

        if event_count > 0 {
            context.info(&format!("Found {} new deposits.", event_count));
        } else {
            context.debug(&format!("No deposits in blocks {}..={}", range.from, range.to));
        }
    }

    pub fn log_counter_push(job: &str, series: usize, success: bool) {
        let context = LogContext::new("metrics", "push")
            .with_metadata("job", json!(job))
            .with_metadata("series", json!(series))
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("Pushed {} series for job {}", series, job));
        } else {
            context.warn(&format!("Failed to push metrics for job {}", job));
        }
    }
}

/// Writes every record to stderr and to the log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Initialize structured logging for the application
pub fn init_logging(config: &LoggingConfig) -> Result<(), SystemError> {
    let level = LevelFilter::from_str(&config.level)
        .map_err(|e| SystemError::Logger(format!("invalid level '{}': {}", config.level, e)))?;
    let pretty = config.format == "pretty";

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_env(env_logger::Env::default())
        .format(move |buf, record| {
            // Structured lines are produced by LogContext; everything else gets a plain prefix
            match serde_json::from_str::<Value>(record.args().to_string().as_str()) {
                Ok(json_value) if pretty => {
                    writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
                }
                Ok(json_value) => writeln!(buf, "{}", json_value),
                Err(_) => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                ),
            }
        });

    if config.file_enabled {
        if let Some(path) = &config.file_path {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
        }
    }

    builder
        .try_init()
        .map_err(|e| SystemError::Logger(e.to_string()))?;

    info!("Structured logging initialized");
    Ok(())
}
