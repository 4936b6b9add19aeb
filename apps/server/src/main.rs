//! TVL Monitor - Headless Server
//!
//! Polls a protocol's Total Value Locked and emails subscribers on every cycle,
//! flagging changes that meet the configured threshold.

mod config;
mod logging;
mod monitor;

use clap::Parser;
use config::{AppConfig, ConfigError};
use monitor::{Monitor, MonitorSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tvl_alerts::{Notifier, SmtpMailer};
use tvl_core::{JsonFileStore, MonitorState, StateStore, StoreError};
use tvl_feeds::{RecipientResolver, RetryPolicy, TvlFetcher};

/// TVL Monitor CLI
#[derive(Parser, Debug)]
#[command(name = "tvl-monitor")]
#[command(about = "Monitor a protocol's TVL and email significant changes", long_about = None)]
struct Args {
    /// DeFiLlama protocol slug
    #[arg(short, long, default_value = TvlFetcher::DEFAULT_PROTOCOL)]
    protocol: String,

    /// State file path
    #[arg(short, long, default_value = AppConfig::DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    /// Log file path (lines are also written to stdout)
    #[arg(long, default_value = "tvl_monitor.log")]
    log_file: PathBuf,

    /// Seconds between cycles
    #[arg(short, long, default_value_t = 60)]
    interval_secs: u64,

    /// Override the persisted alert threshold (percent)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Fetch attempts per cycle
    #[arg(short, long, default_value_t = 3)]
    retries: u32,

    /// Keep at most this many message log records
    #[arg(long)]
    max_messages: Option<usize>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn build_config(args: &Args) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::from_env()?;
    config.protocol = args.protocol.clone();
    config.state_file = args.state_file.clone();
    config.poll_interval = Duration::from_secs(args.interval_secs);
    config.retry = RetryPolicy {
        max_attempts: args.retries,
        ..RetryPolicy::default()
    };
    config.threshold = args.threshold;
    config.max_messages = args.max_messages;
    Ok(config)
}

fn build_notifier(config: &AppConfig) -> Notifier {
    let Some(mailer_config) = &config.mailer else {
        warn!("SMTP_EMAIL or SMTP_PASSWORD not set; email notifications disabled");
        return Notifier::disabled();
    };

    match SmtpMailer::new(mailer_config) {
        Ok(mailer) => {
            info!(
                "  Mail relay: {}:{} as {}",
                mailer_config.host, mailer_config.port, mailer_config.sender
            );
            Notifier::new(Arc::new(mailer))
        }
        Err(e) => {
            error!("Failed to set up mail transport, notifications disabled: {}", e);
            Notifier::disabled()
        }
    }
}

fn load_state(store: &JsonFileStore) -> MonitorState {
    match store.load() {
        Ok(state) => state,
        Err(e @ StoreError::Serialize(_)) => {
            error!("Failed to load state, starting fresh: {}", e);
            match store.quarantine() {
                Ok(moved) => warn!("Moved unreadable state file to {}", moved.display()),
                Err(e) => error!("Failed to move unreadable state file aside: {}", e),
            }
            MonitorState::default()
        }
        Err(e) => {
            error!("Failed to load state, starting fresh: {}", e);
            MonitorState::default()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let _log_guard = match logging::init_logging(&args.log_level, &args.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(1);
        }
    };

    info!("TVL Monitor starting...");
    info!("  Protocol: {}", config.protocol);
    info!("  State file: {}", config.state_file.display());
    info!("  Interval: {:?}", config.poll_interval);
    info!("  Retries: {}", config.retry.attempts());

    let metric = match TvlFetcher::new(config.protocol.clone()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to create TVL fetcher: {}", e);
            return ExitCode::from(1);
        }
    };
    let recipients = match RecipientResolver::new(config.recipients_url.clone()) {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("Failed to create recipient resolver: {}", e);
            return ExitCode::from(1);
        }
    };

    let store = JsonFileStore::new(&config.state_file);
    let mut state = load_state(&store);
    if let Some(threshold) = config.threshold {
        state.threshold = threshold;
    }
    info!("  Threshold: {:.2}%", state.threshold);

    let monitor = Monitor::new(
        Arc::new(metric),
        Arc::new(recipients),
        build_notifier(&config),
        Arc::new(store),
        MonitorSettings {
            retry: config.retry.clone(),
            interval: config.poll_interval,
            max_messages: config.max_messages,
        },
    );

    if let Err(e) = monitor.seed(&mut state).await {
        error!("Failed to initialize TVL state: {}", e);
        return ExitCode::from(1);
    }

    info!("Press Ctrl+C to stop...");
    monitor.run(&mut state, shutdown_signal()).await;

    ExitCode::SUCCESS
}
