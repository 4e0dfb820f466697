use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ExhaustedError;
use crate::logging::{ErrorLogger, PerformanceMonitor};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after every further failure
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Exponential backoff around a fallible async operation.
///
/// Every error is retried the same way. The delay is not capped and carries
/// no jitter, so `max_attempts` bounds the total wait.
pub struct RetryManager {
    config: RetryConfig,
    operation_name: String,
}

impl RetryManager {
    pub fn new(operation_name: &str, config: RetryConfig) -> Self {
        Self {
            config,
            operation_name: operation_name.to_string(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, ExhaustedError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let monitor = PerformanceMonitor::new(&format!("retry_{}", self.operation_name));
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt_index = 0;

        loop {
            let error = match operation().await {
                Ok(result) => {
                    if attempt_index > 0 {
                        ErrorLogger::log_recovery_success(
                            &self.operation_name,
                            attempt_index + 1,
                            monitor.elapsed_ms(),
                        );
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            let attempt = attempt_index + 1;
            if attempt >= max_attempts {
                ErrorLogger::log_retry_exhausted(&self.operation_name, &error, max_attempts);
                return Err(ExhaustedError {
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.calculate_delay(attempt_index);
            ErrorLogger::log_retry_attempt(&self.operation_name, &error, attempt, max_attempts, delay);
            sleep(delay).await;
            attempt_index += 1;
        }
    }

    /// Delay after the failed attempt with the given 0-based index
    pub fn calculate_delay(&self, attempt_index: u32) -> Duration {
        self.config
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}
