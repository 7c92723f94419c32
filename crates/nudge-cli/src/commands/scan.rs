use chrono::{DateTime, Utc};
use clap::Args;
use nudge_core::Config;

use crate::common::{open_engine, parse_at, print_json};

#[derive(Args)]
pub struct ScanArgs {
    /// Scan time as RFC 3339 (defaults to now)
    #[arg(long, value_parser = parse_at)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between scans (defaults to scheduler.scan_period_seconds)
    #[arg(long)]
    pub period_seconds: Option<u64>,
}

pub fn run_scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;
    let report = engine.scheduler().scan(args.at.unwrap_or_else(Utc::now))?;
    print_json(&report)
}

pub fn run_watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();
    if let Some(seconds) = args.period_seconds {
        config.scheduler.scan_period_seconds = seconds;
        config.validate()?;
    }
    let period = config.scan_period();
    let engine = open_engine(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let handle = engine.scheduler().spawn(period);
        eprintln!(
            "watching for unread conversations every {}s, press Ctrl-C to stop",
            period.as_secs()
        );
        let interrupted = tokio::signal::ctrl_c().await;
        if let Err(e) = &interrupted {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        }
        handle.stop().await?;
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
