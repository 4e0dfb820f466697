use clap::Parser;
use eth_deposit_tracker::blockchain::{DepositMonitor, LedgerClient, RangeScanner, RpcClient};
use eth_deposit_tracker::config::AppConfig;
use eth_deposit_tracker::error::{SystemError, TrackerError};
use eth_deposit_tracker::logging::{init_logging, ErrorLogger, LogContext};
use eth_deposit_tracker::metrics::{MetricsRegistry, MetricsSink, PushGatewayClient};
use eth_deposit_tracker::notification::{LogNotifier, NotificationDispatcher, Notifier, TelegramNotifier};
use log::{error, info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deposit-tracker")]
#[command(about = "Watches the Beacon Deposit Contract and reports every deposit")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    if let Some(path) = &args.config {
        std::env::set_var("CONFIG_FILE", path);
    }

    let mut config = AppConfig::load().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging)?;
    info!("ETH Deposit Tracker starting");

    if let Err(e) = run(config).await {
        ErrorLogger::log_error(&e, Some(LogContext::new("main", "startup")));
        return Err(e.into());
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<(), TrackerError> {
    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcClient::new_with_config(
        config.rpc.endpoint.clone(),
        config.rpc.timeout_seconds,
    )?);

    let notifier: Arc<dyn Notifier> = if config.telegram.enabled {
        Arc::new(TelegramNotifier::new(&config.telegram)?)
    } else {
        warn!("Telegram notifications disabled, deposits will only be logged");
        Arc::new(LogNotifier)
    };

    let registry = Arc::new(MetricsRegistry::new());
    let metrics: Arc<dyn MetricsSink> = registry.clone();

    let scanner = RangeScanner::from_config(Arc::clone(&ledger), &config.scanner);
    let mut monitor = DepositMonitor::new(
        ledger,
        scanner,
        NotificationDispatcher::new(notifier),
        metrics,
        config.monitor.clone(),
    );

    monitor.bootstrap().await?;

    let pusher = match PushGatewayClient::from_config(&config.metrics)? {
        Some(client) => Some(Arc::new(client).spawn_pusher(
            Arc::clone(&registry),
            Duration::from_secs(config.metrics.push_interval_seconds.max(1)),
            Arc::clone(&monitor.shutdown_signal),
        )),
        None => None,
    };

    let shutdown_signal = Arc::clone(&monitor.shutdown_signal);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping after the current iteration");
                shutdown_signal.store(true, Ordering::SeqCst);
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    monitor.run().await;

    if let Some(handle) = pusher {
        handle
            .await
            .map_err(|e| SystemError::HttpClient(format!("metrics pusher task failed: {}", e)))?;
    }

    Ok(())
}
