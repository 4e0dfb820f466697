pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod retry;

pub use blockchain::{DepositMonitor, LedgerClient, LogFilter, RangeScanner, RpcClient, ScanBatch, TickOutcome};
pub use config::{AppConfig, LoggingConfig, MetricsConfig, MonitorConfig, RpcConfig, ScannerConfig, TelegramConfig};
pub use error::{Result, TickError, TrackerError};
pub use logging::{init_logging, ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use metrics::{MetricsRegistry, MetricsSink, PushGatewayClient};
pub use notification::{LogNotifier, NotificationDispatcher, Notifier, TelegramNotifier};
pub use retry::{RetryConfig, RetryManager};
