//! Zero Screener Library
//!
//! Multi-timeframe crypto screener: ranks the most traded spot pairs by
//! Stochastic Slow and RSI readings, confirms them against two coarser
//! timeframes and classifies each pair into a discrete signal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   zero-screener (Rust Service)                      │
//! │                           :4440                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Market Data    │  │  Screener       │  │  Alerts         │      │
//! │  │  Binance+Cache  │─▶│  Engine         │─▶│  zero-channels  │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Signals
//!
//! The native timeframe provides %K, %D and RSI; the middle (MTF) and higher
//! (HTF) timeframes contribute their RSI as trend confirmation. See
//! [`signal::classify`] for the rule order.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicators;
pub mod notification;
pub mod routes;
pub mod screener;
pub mod signal;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use zero_common::config::Config;
use zero_common::validation::Validate;

use crate::data::{shared_limiter, BinanceAdapter, MarketDataProvider, ResponseCache, SharedCache};
use crate::notification::NotificationClient;
use crate::screener::{EngineOptions, ScreenerEngine, ScreenerResult, ScreenerSettings};

/// Upper bound on a single HTTP request; a manual pass is capped separately.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Upstream response cache
    pub cache: SharedCache,
    /// Pass runner
    pub engine: ScreenerEngine<dyn MarketDataProvider>,
    /// Settings used by the next pass
    pub settings: RwLock<ScreenerSettings>,
    /// Last successfully completed pass
    pub latest: RwLock<Option<ScreenerResult>>,
    /// Held while a pass runs
    pass_lock: Mutex<()>,
}

impl ScreenerState {
    /// Build state backed by the Binance adapter.
    pub fn new(config: Config) -> Result<Self> {
        let cache: SharedCache = Arc::new(ResponseCache::with_ttl(config.screener.cache_ttl_secs));
        let limiter = shared_limiter("binance", config.screener.rate_limit_rpm);
        let provider: Arc<dyn MarketDataProvider> = Arc::new(BinanceAdapter::new(
            config.screener.provider_url.clone(),
            Arc::clone(&cache),
            limiter,
        ));

        Self::with_provider(config, provider, cache)
    }

    /// Build state around an arbitrary provider.
    pub fn with_provider(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        cache: SharedCache,
    ) -> Result<Self> {
        let settings = ScreenerSettings::from_config(&config.screener)
            .context("Invalid screener settings")?;

        let mut engine = ScreenerEngine::new(provider, EngineOptions::from(&config.screener));
        let notification = NotificationClient::new(&config.screener.notification);
        if notification.is_enabled() {
            engine = engine.with_alerts(Arc::new(notification));
        }

        Ok(Self {
            config,
            cache,
            engine,
            settings: RwLock::new(settings),
            latest: RwLock::new(None),
            pass_lock: Mutex::new(()),
        })
    }

    /// Run one pass on a snapshot of the current settings.
    ///
    /// Only a completed, non-failed pass replaces the published result. A
    /// timed-out pass is discarded; fetched payloads stay in the cache.
    pub async fn run_pass(&self) -> zero_common::Result<ScreenerResult> {
        let _guard = self
            .pass_lock
            .try_lock()
            .map_err(|_| zero_common::Error::Busy("a pass is already in progress".into()))?;

        let settings = self.settings.read().await.clone();
        let timeout = Duration::from_secs(self.config.screener.pass_timeout_secs);

        let result = tokio::time::timeout(timeout, self.engine.run_pass(&settings))
            .await
            .map_err(|_| {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Screening pass timed out");
                zero_common::Error::Timeout
            })?;

        if !result.failed {
            *self.latest.write().await = Some(result.clone());
        }
        Ok(result)
    }

    /// Replace the settings used by subsequent passes.
    pub async fn update_settings(&self, settings: ScreenerSettings) -> zero_common::Result<()> {
        settings
            .validate()
            .and_then(|()| settings.check_allow_list(&self.config.screener.restricted_symbols))
            .map_err(|e| zero_common::Error::InvalidInput(e.to_string()))?;

        tracing::info!(settings = %settings.summary(), "Screener settings updated");
        *self.settings.write().await = settings;
        Ok(())
    }
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/screener", get(routes::get_screener))
        .route("/api/v1/screener/run", post(routes::run_screener))
        .route(
            "/api/v1/settings",
            get(routes::get_settings).put(routes::put_settings),
        )
        .route(
            "/api/v1/cache",
            get(routes::cache_stats).delete(routes::clear_cache),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(cors)
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let state = Arc::new(ScreenerState::new(config)?);
        Ok(Self { state })
    }

    /// Start the scheduler and the HTTP server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .screener_addr()
            .parse()
            .context("Invalid bind address")?;

        let app = build_router(self.state.clone());

        let scheduler_state = self.state.clone();
        tokio::spawn(async move {
            run_scheduler(scheduler_state).await;
        });

        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Screener service stopped");
        Ok(())
    }
}

/// Run passes back to back, sleeping `refreshInterval` between them.
async fn run_scheduler(state: Arc<ScreenerState>) {
    loop {
        match state.run_pass().await {
            Ok(result) if result.failed => {
                tracing::warn!(pass_id = %result.pass_id, "Pass failed, keeping previous result");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Scheduled pass skipped");
            }
        }

        let interval = state.settings.read().await.refresh_interval;
        tokio::time::sleep(Duration::from_millis(interval)).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
