use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::logging::{LogContext, MetricsLogger};

/// Counter sink the monitor reports deposits to
pub trait MetricsSink: Send + Sync {
    fn add_to_counter(&self, name: &str, delta: u64);
}

/// In-process monotonic counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.lock().clone()
    }

    /// Prometheus text exposition of every counter
    pub fn render(&self) -> String {
        let mut body = String::new();
        for (name, value) in self.lock().iter() {
            let _ = writeln!(body, "# TYPE {} counter", name);
            let _ = writeln!(body, "{} {}", name, value);
        }
        body
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, u64>> {
        // A poisoned map still holds valid counts
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsSink for MetricsRegistry {
    fn add_to_counter(&self, name: &str, delta: u64) {
        let mut counters = self.lock();
        let value = counters.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
    }
}

/// Pushes the registry to a Prometheus Pushgateway
pub struct PushGatewayClient {
    client: Client,
    gateway_url: String,
    job_name: String,
}

impl PushGatewayClient {
    pub fn new(gateway_url: &str, job_name: &str) -> Result<Self, MetricsError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            job_name: job_name.to_string(),
        })
    }

    /// `None` when no gateway is configured
    pub fn from_config(config: &MetricsConfig) -> Result<Option<Self>, MetricsError> {
        match config.pushgateway_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(Some(Self::new(url, &config.job_name)?)),
            _ => Ok(None),
        }
    }

    pub fn push_url(&self) -> String {
        format!("{}/metrics/job/{}", self.gateway_url, self.job_name)
    }

    /// Replace this job's series on the gateway with the registry's contents
    pub async fn push(&self, registry: &MetricsRegistry) -> Result<(), MetricsError> {
        let body = registry.render();
        let series = registry.snapshot().len();

        let result = self.send(body).await;
        MetricsLogger::log_counter_push(&self.job_name, series, result.is_ok());
        result
    }

    async fn send(&self, body: String) -> Result<(), MetricsError> {
        let response = self
            .client
            .put(self.push_url())
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MetricsError::Http {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Push on a fixed interval until `shutdown` is set. A final push is made
    /// on the way out so the last iteration's counts are not lost.
    pub fn spawn_pusher(
        self: Arc<Self>,
        registry: Arc<MetricsRegistry>,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let stopping = shutdown.load(Ordering::SeqCst);

                if let Err(e) = self.push(&registry).await {
                    LogContext::new("metrics", "push")
                        .with_metadata("gateway", json!(self.gateway_url))
                        .warn(&format!("Metrics push failed: {}", e));
                }

                if stopping {
                    break;
                }
            }
        })
    }
}
