//! freebet-watch: "free bet of the day" change monitor.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires up the collaborators and runs the selected mode: a single check
//! (default), a watch loop with graceful shutdown, or one of the
//! connectivity tests.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use freebet_watch::config::AppConfig;
use freebet_watch::engine::{Monitor, RunReport};

#[derive(Parser)]
#[command(name = "freebet-watch")]
#[command(about = "Watches a free-bet-of-the-day page and notifies on change")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Check the page once and exit (default)
    CheckOnce,

    /// Check the page on a fixed interval until Ctrl+C
    Watch {
        /// Minutes between checks (overrides config and INTERVAL_TIME)
        #[arg(short, long)]
        interval_mins: Option<u64>,
    },

    /// Send a test notification without fetching the page; exits non-zero if delivery fails
    #[command(alias = "test-email")]
    TestNotify,

    /// Probe the record store only; exits non-zero if it is unreachable
    #[command(alias = "test-store")]
    TestConnection,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    init_logging();

    let mut cfg = AppConfig::load_or_default(&cli.config)?;
    cfg.apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(Command::Watch {
        interval_mins: Some(mins),
    }) = cli.command
    {
        cfg.monitor.interval_mins = mins;
    }
    cfg.validate().context("Invalid configuration")?;

    let monitor = Monitor::from_config(&cfg)?;

    match cli.command.unwrap_or(Command::CheckOnce) {
        Command::CheckOnce => {
            let report = monitor.run_once().await;
            log_run_report(&report);
        }
        Command::Watch { .. } => watch(&monitor, &cfg).await,
        Command::TestNotify => {
            monitor
                .send_test_notification()
                .await
                .context("Test notification failed")?;
            info!("Test notification sent");
        }
        Command::TestConnection => {
            monitor
                .test_connection()
                .await
                .context("Record store connection test failed")?;
        }
    }

    Ok(())
}

/// Run checks on a fixed interval until Ctrl+C. Runs never overlap.
async fn watch(monitor: &Monitor, cfg: &AppConfig) {
    let mut interval = tokio::time::interval(cfg.check_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_mins = cfg.monitor.interval_mins,
        url = %cfg.monitor.url,
        "Entering watch loop. Press Ctrl+C to stop."
    );

    let mut runs: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                runs += 1;
                let report = monitor.run_once().await;
                log_run_report(&report);
            }
            _ = &mut shutdown => {
                info!(runs, "Shutdown signal received.");
                break;
            }
        }
    }
}

/// Log a one-line run summary.
fn log_run_report(report: &RunReport) {
    if report.outcome.is_failure() {
        error!(
            outcome = %report.outcome,
            phase = ?report.phase,
            error = report.error.as_deref().unwrap_or(""),
            "Run aborted"
        );
        return;
    }

    let match_info = report
        .record
        .as_ref()
        .map(|r| r.match_info().to_string())
        .unwrap_or_default();
    info!(
        outcome = %report.outcome,
        match_info = %match_info,
        persisted = report.persisted,
        degraded = report.degraded,
        "Run finished"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("freebet_watch=info"));

    let json_logging = std::env::var("FREEBET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
