use thiserror::Error;

use crate::models::ScanRange;

/// Main error type for the deposit tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Iteration failed: {0}")]
    Iteration(#[from] TickError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Ledger RPC errors.
///
/// Every variant is treated the same way by the retry layer; the variants
/// only exist so that log lines say what went wrong.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i32, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Returned by the retry layer once every attempt has failed
#[derive(Error, Debug)]
#[error("gave up after {attempts} attempts, last error: {last_error}")]
pub struct ExhaustedError<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Block range scanning errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to fetch logs for blocks {}..={}: {source}", .range.from, .range.to)]
    Exhausted {
        range: ScanRange,
        #[source]
        source: ExhaustedError<RpcError>,
    },
}

/// Failure of a single monitor iteration. Contained at the loop boundary.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("failed to query latest block: {0}")]
    LatestHeight(#[source] RpcError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("HTTP error occurred: status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Error sending notification: {0}")]
    Transport(reqwest::Error),
}

/// Metrics push errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Pushgateway rejected metrics: status {status}")]
    Http { status: u16 },

    #[error("Pushgateway request failed: {0}")]
    Transport(reqwest::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// System-level errors
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    #[error("Logger setup failed: {0}")]
    Logger(String),
}

// Request URLs carry credentials (bot token, RPC API key) and must not
// reach the logs, so reqwest errors are stored without them.

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Http(e.without_url())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(e: reqwest::Error) -> Self {
        NotificationError::Transport(e.without_url())
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(e: reqwest::Error) -> Self {
        MetricsError::Transport(e.without_url())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal at startup
    Critical,
    /// A whole iteration was lost
    High,
    /// Something degraded but processing went on
    Medium,
    Low,
}

impl TrackerError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrackerError::Config(_) => ErrorSeverity::Critical,
            TrackerError::System(_) => ErrorSeverity::Critical,
            TrackerError::Rpc(RpcError::Connection(_)) => ErrorSeverity::Critical,

            TrackerError::Iteration(e) => e.severity(),
            TrackerError::Rpc(_) => ErrorSeverity::Medium,

            TrackerError::Notification(_) => ErrorSeverity::Medium,
            TrackerError::Metrics(_) => ErrorSeverity::Low,
        }
    }
}

impl TickError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TickError::Scan(_) => ErrorSeverity::High,
            TickError::LatestHeight(_) => ErrorSeverity::Medium,
        }
    }
}

impl NotificationError {
    /// Short failure class used in log metadata
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationError::Http { .. } => "http_status",
            NotificationError::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let critical_error = TrackerError::Config(ConfigError::MissingEnvVar("TEST".to_string()));
        assert_eq!(critical_error.severity(), ErrorSeverity::Critical);

        let scan_error = TrackerError::Iteration(TickError::Scan(ScanError::Exhausted {
            range: ScanRange { from: 1, to: 2 },
            source: ExhaustedError {
                attempts: 5,
                last_error: RpcError::Status { status: 503 },
            },
        }));
        assert_eq!(scan_error.severity(), ErrorSeverity::High);

        let height_error = TrackerError::Iteration(TickError::LatestHeight(
            RpcError::InvalidResponse("null".to_string()),
        ));
        assert_eq!(height_error.severity(), ErrorSeverity::Medium);

        let metrics_error = TrackerError::Metrics(MetricsError::Http { status: 500 });
        assert_eq!(metrics_error.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_error_display() {
        let error = TrackerError::Rpc(RpcError::Method {
            code: -32601,
            message: "Method not found".to_string(),
        });
        assert_eq!(
            format!("{}", error),
            "RPC error: RPC method error: code=-32601, message=Method not found"
        );
    }

    #[test]
    fn test_scan_error_names_range_and_last_error() {
        let error = ScanError::Exhausted {
            range: ScanRange { from: 100, to: 1099 },
            source: ExhaustedError {
                attempts: 5,
                last_error: RpcError::Status { status: 429 },
            },
        };

        let message = error.to_string();
        assert!(message.contains("100..=1099"));
        assert!(message.contains("gave up after 5 attempts"));
        assert!(message.contains("HTTP status 429"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_notification_error_kind() {
        let http = NotificationError::Http {
            status: 400,
            body: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(http.kind(), "http_status");
        assert!(http.to_string().contains("status 400"));
    }

    #[test]
    fn test_error_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let tracker_error = TrackerError::System(SystemError::FileSystem(io_error));

        assert!(format!("{}", tracker_error).contains("File system error"));
    }
}
