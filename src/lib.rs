pub mod config;
pub mod engine;
pub mod log;
pub mod providers;
pub mod rate_source;
pub mod report;
pub mod ui;

use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::{Balance, ConversionEngine};
use crate::providers::{CbrRateSource, RetryPolicy};
use crate::rate_source::RateSource;

pub enum AppCommand {
    /// Print the cross-rate table for the held currencies.
    Rates,
    /// Print the balance valued in each held currency.
    Total,
    /// Optionally replace and/or adjust the balance, then print it.
    Balance {
        set: Vec<(String, Decimal)>,
        add: Vec<(String, Decimal)>,
    },
    /// Periodically re-fetch and print the cross-rate table.
    Watch { period_minutes: Option<u64> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("FX balance tracker starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let cbr = config.providers.cbr.as_ref();
    let base_url = cbr.map_or(config::DEFAULT_CBR_BASE_URL, |c| &c.base_url);
    let retry = cbr.map_or(RetryPolicy::default(), |c| RetryPolicy {
        retries: c.retries,
        delay_ms: c.retry_delay_ms,
    });
    let source: Arc<dyn RateSource> = Arc::new(CbrRateSource::new(base_url, retry));

    let mut engine = ConversionEngine::new(config.balance.clone(), source)?;

    match command {
        AppCommand::Rates => report::show_rates(&engine).await,
        AppCommand::Total => report::show_totals(&engine).await,
        AppCommand::Balance { set, add } => {
            if !set.is_empty() {
                engine.set_balance(set.into_iter().collect::<Balance>())?;
            }
            if !add.is_empty() {
                engine.modify_balance(&add.into_iter().collect::<Balance>())?;
            }
            report::show_balance(&engine);
            Ok(())
        }
        AppCommand::Watch { period_minutes } => {
            let period = period_minutes.unwrap_or(config.refresh_minutes);
            watch(&engine, period).await
        }
    }
}

/// Re-fetches and prints the rate table and totals every `period_minutes`,
/// starting immediately. Each tick is an independent feed snapshot; totals
/// that cannot be valued only produce a warning, the loop keeps running.
async fn watch(engine: &ConversionEngine, period_minutes: u64) -> Result<()> {
    if period_minutes == 0 {
        anyhow::bail!("refresh period must be at least one minute");
    }
    info!("watching rates every {period_minutes} minute(s)");
    let mut ticker = tokio::time::interval(Duration::from_secs(period_minutes * 60));
    loop {
        ticker.tick().await;
        report::show_rates(engine).await?;
        if let Err(e) = report::show_totals(engine).await {
            warn!("{e}");
        }
        ui::print_separator();
    }
}
