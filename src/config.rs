use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// Beacon Deposit Contract on Ethereum mainnet
pub const BEACON_DEPOSIT_CONTRACT: &str = "0x00000000219ab540356cBB839Cbe05303d7705Fa";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub scanner: ScannerConfig,
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// Ledger RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Block range scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Contract whose logs are tracked
    pub contract_address: String,
    /// Maximum number of blocks requested per log fetch
    pub window_size: u64,
    /// Attempts per log fetch before the tick is given up
    pub max_attempts: u32,
    /// Delay before the first retry, doubled after every failure
    pub retry_base_delay_ms: u64,
}

/// Monitor loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Wait when the chain has no new blocks
    pub idle_delay_seconds: u64,
    /// Wait after a successful iteration
    pub tick_delay_seconds: u64,
    /// Wait after a failed iteration
    pub failure_delay_seconds: u64,
    /// Counter incremented with the number of deposits seen
    pub deposits_counter: String,
}

/// Telegram notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout_seconds: u64,
}

/// Prometheus Pushgateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Pushing is disabled when unset
    pub pushgateway_url: Option<String>,
    pub job_name: String,
    pub push_interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
    /// Mirror log output to a file
    pub file_enabled: bool,
    pub file_path: Option<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            contract_address: BEACON_DEPOSIT_CONTRACT.to_string(),
            window_size: 1000,
            max_attempts: 5,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_delay_seconds: 30,
            tick_delay_seconds: 5,
            failure_delay_seconds: 60,
            deposits_counter: "new_deposits_total".to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
            timeout_seconds: 10,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            pushgateway_url: None,
            job_name: "deposit_tracker".to_string(),
            push_interval_seconds: 15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_enabled: true,
            file_path: Some("deposit_tracker.log".to_string()),
        }
    }
}

impl ScannerConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

impl MonitorConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay_seconds)
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_secs(self.tick_delay_seconds)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_secs(self.failure_delay_seconds)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("ALCHEMY_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Ok(timeout) = env::var("RPC_TIMEOUT_SECONDS") {
            self.rpc.timeout_seconds = parse_env("RPC_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(address) = env::var("DEPOSIT_CONTRACT_ADDRESS") {
            self.scanner.contract_address = address;
        }
        if let Ok(window) = env::var("SCAN_WINDOW_SIZE") {
            self.scanner.window_size = parse_env("SCAN_WINDOW_SIZE", window)?;
        }
        if let Ok(attempts) = env::var("RPC_MAX_ATTEMPTS") {
            self.scanner.max_attempts = parse_env("RPC_MAX_ATTEMPTS", attempts)?;
        }

        if let Ok(token) = env::var("TELEGRAM_API_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(chat_id) = env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Ok(enabled) = env::var("TELEGRAM_ENABLED") {
            self.telegram.enabled = parse_env("TELEGRAM_ENABLED", enabled)?;
        }

        if let Ok(url) = env::var("PUSHGATEWAY_URL") {
            // An empty value turns pushing off
            let url = url.trim();
            self.metrics.pushgateway_url = (!url.is_empty()).then(|| url.to_string());
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(file_enabled) = env::var("LOG_FILE_ENABLED") {
            self.logging.file_enabled = parse_env("LOG_FILE_ENABLED", file_enabled)?;
        }
        if let Ok(file_path) = env::var("LOG_FILE_PATH") {
            self.logging.file_path = Some(file_path);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("ALCHEMY_RPC_URL".to_string()));
        }
        if !is_http_url(&self.rpc.endpoint) {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(invalid("rpc.timeout_seconds", self.rpc.timeout_seconds));
        }

        let address = &self.scanner.contract_address;
        if !address.starts_with("0x")
            || address.len() != 42
            || !address[2..].chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(invalid("scanner.contract_address", address));
        }
        if self.scanner.window_size == 0 {
            return Err(invalid("scanner.window_size", self.scanner.window_size));
        }
        if self.scanner.max_attempts == 0 || self.scanner.max_attempts > 20 {
            return Err(invalid("scanner.max_attempts", self.scanner.max_attempts));
        }
        if self.scanner.retry_base_delay_ms == 0 {
            return Err(invalid(
                "scanner.retry_base_delay_ms",
                self.scanner.retry_base_delay_ms,
            ));
        }

        if self.monitor.deposits_counter.trim().is_empty() {
            return Err(invalid("monitor.deposits_counter", &self.monitor.deposits_counter));
        }

        if self.telegram.enabled {
            if self.telegram.bot_token.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar("TELEGRAM_API_TOKEN".to_string()));
            }
            if self.telegram.chat_id.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar("TELEGRAM_CHAT_ID".to_string()));
            }
            if !is_http_url(&self.telegram.api_base) {
                return Err(ConfigError::InvalidUrl(self.telegram.api_base.clone()));
            }
        }

        if let Some(url) = &self.metrics.pushgateway_url {
            if !is_http_url(url) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
            if self.metrics.push_interval_seconds == 0 {
                return Err(invalid(
                    "metrics.push_interval_seconds",
                    self.metrics.push_interval_seconds,
                ));
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid("logging.format", &self.logging.format));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::NamedTempFile;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.rpc.endpoint = "https://eth-mainnet.example.com/v2/key".to_string();
        config.telegram.bot_token = "123:abc".to_string();
        config.telegram.chat_id = "42".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.contract_address, BEACON_DEPOSIT_CONTRACT);
        assert_eq!(config.scanner.window_size, 1000);
        assert_eq!(config.scanner.max_attempts, 5);
        assert_eq!(config.scanner.retry_base_delay_ms, 1000);
        assert_eq!(config.monitor.idle_delay(), Duration::from_secs(30));
        assert_eq!(config.monitor.tick_delay(), Duration::from_secs(5));
        assert_eq!(config.monitor.failure_delay(), Duration::from_secs(60));
        assert_eq!(config.monitor.deposits_counter, "new_deposits_total");
        assert_eq!(config.logging.file_path.as_deref(), Some("deposit_tracker.log"));
    }

    #[test]
    fn test_retry_config_from_scanner() {
        let retry = ScannerConfig::default().retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());

        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(var)) if var == "ALCHEMY_RPC_URL"
        ));

        let mut config = valid_config();
        config.rpc.endpoint = "invalid-url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let mut config = valid_config();
        config.scanner.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.scanner.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.scanner.contract_address = "0x1234".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.telegram.bot_token.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(var)) if var == "TELEGRAM_API_TOKEN"
        ));

        // Credentials are not needed once Telegram is off
        config.telegram.enabled = false;
        assert!(config.validate().is_ok());

        let mut config = valid_config();
        config.metrics.pushgateway_url = Some("pushgateway:9091".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("ALCHEMY_RPC_URL", "https://test-rpc.com/");
        env::set_var("TELEGRAM_API_TOKEN", "999:token");
        env::set_var("TELEGRAM_CHAT_ID", "2125");
        env::set_var("SCAN_WINDOW_SIZE", "250");
        env::set_var("PUSHGATEWAY_URL", "http://localhost:9091");
        env::set_var("LOG_LEVEL", "debug");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.rpc.endpoint, "https://test-rpc.com/");
        assert_eq!(config.telegram.bot_token, "999:token");
        assert_eq!(config.telegram.chat_id, "2125");
        assert_eq!(config.scanner.window_size, 250);
        assert_eq!(config.metrics.pushgateway_url.as_deref(), Some("http://localhost:9091"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());

        env::remove_var("ALCHEMY_RPC_URL");
        env::remove_var("TELEGRAM_API_TOKEN");
        env::remove_var("TELEGRAM_CHAT_ID");
        env::remove_var("SCAN_WINDOW_SIZE");
        env::remove_var("PUSHGATEWAY_URL");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_empty_pushgateway_env_disables_push() {
        env::set_var("PUSHGATEWAY_URL", "");

        let mut config = valid_config();
        config.metrics.pushgateway_url = Some("http://localhost:9091".to_string());
        config.apply_env_overrides().unwrap();

        assert_eq!(config.metrics.pushgateway_url, None);
        assert!(config.validate().is_ok());

        env::remove_var("PUSHGATEWAY_URL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_values() {
        env::set_var("RPC_TIMEOUT_SECONDS", "invalid");

        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var("RPC_TIMEOUT_SECONDS");
    }

    #[test]
    #[serial]
    fn test_config_file_loading() {
        let config_content = r#"
[rpc]
endpoint = "https://custom-rpc.com/"
timeout_seconds = 45

[scanner]
window_size = 500
max_attempts = 3

[monitor]
idle_delay_seconds = 12

[telegram]
enabled = false

[logging]
level = "warn"
format = "json"
file_enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, config_content.as_bytes()).unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());
        let config = AppConfig::load_from_file().unwrap();
        env::remove_var("CONFIG_FILE");

        assert_eq!(config.rpc.endpoint, "https://custom-rpc.com/");
        assert_eq!(config.rpc.timeout_seconds, 45);
        assert_eq!(config.scanner.window_size, 500);
        assert_eq!(config.scanner.max_attempts, 3);
        // Missing keys fall back to defaults
        assert_eq!(config.scanner.retry_base_delay_ms, 1000);
        assert_eq!(config.scanner.contract_address, BEACON_DEPOSIT_CONTRACT);
        assert_eq!(config.monitor.idle_delay_seconds, 12);
        assert_eq!(config.monitor.tick_delay_seconds, 5);
        assert!(!config.telegram.enabled);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
        assert!(!config.logging.file_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_malformed_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, b"[scanner\nwindow_size = ").unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());
        let result = AppConfig::load_from_file();
        env::remove_var("CONFIG_FILE");

        assert!(matches!(result, Err(ConfigError::Parsing(_))));
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = AppConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[rpc]"));
        assert!(sample.contains("[scanner]"));
        assert!(sample.contains("[monitor]"));
        assert!(sample.contains("[telegram]"));
        assert!(sample.contains("[metrics]"));
        assert!(sample.contains("[logging]"));

        let parsed: AppConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.scanner.window_size, 1000);
    }
}
