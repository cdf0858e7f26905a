//! Zero Screener - Multi-timeframe crypto screener for the Zero ecosystem.
//!
//! Ranks the most traded spot pairs by Stochastic Slow and RSI, confirms
//! them on two coarser timeframes and serves the latest pass over HTTP.

use anyhow::Result;
use zero_common::config::Config;
use zero_common::logging::init_logging_with_exclusions;
use zero_screener::ScreenerService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Zero Screener v{}", env!("CARGO_PKG_VERSION"));

    let service = ScreenerService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
