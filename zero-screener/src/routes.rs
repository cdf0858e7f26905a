//! HTTP routes for the screener service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::CacheStats;
use crate::screener::{ScreenedSymbol, ScreenerResult, ScreenerSettings, ScreenerStats};
use crate::signal::Signal;
use crate::ScreenerState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Published pass, optionally narrowed by query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerResponse {
    pub pass_id: String,
    pub symbols: Vec<ScreenedSymbol>,
    pub stats: ScreenerStats,
    pub completed_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScreenerQuery {
    /// Keep only the first N symbols
    pub limit: Option<usize>,
    /// Keep only symbols with this signal (e.g. "ULTRA_BUY")
    pub signal: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheResponse {
    pub size: usize,
    #[serde(flatten)]
    pub stats: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

fn from_error(e: zero_common::Error) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, e.to_string())
}

impl ScreenerResponse {
    fn from_result(result: &ScreenerResult, query: &ScreenerQuery) -> Result<Self, String> {
        let signal = match &query.signal {
            Some(name) => Some(Signal::parse(name).ok_or_else(|| format!("unknown signal '{}'", name))?),
            None => None,
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        let symbols = match signal {
            Some(sig) => result.with_signal(sig).into_iter().take(limit).cloned().collect(),
            None => result.top(limit).to_vec(),
        };

        Ok(Self {
            pass_id: result.pass_id.clone(),
            symbols,
            stats: result.stats.clone(),
            completed_at: result.completed_at.to_rfc3339(),
        })
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "zero-screener".to_string(),
    })
}

/// Last published pass
pub async fn get_screener(
    State(state): State<Arc<ScreenerState>>,
    Query(query): Query<ScreenerQuery>,
) -> Response {
    let latest = state.latest.read().await;
    let Some(result) = latest.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "no pass has completed yet");
    };

    match ScreenerResponse::from_result(result, &query) {
        Ok(body) => Json(body).into_response(),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, msg),
    }
}

/// Run a pass now and return it in full
pub async fn run_screener(State(state): State<Arc<ScreenerState>>) -> Response {
    match state.run_pass().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => from_error(e),
    }
}

pub async fn get_settings(State(state): State<Arc<ScreenerState>>) -> Json<ScreenerSettings> {
    Json(state.settings.read().await.clone())
}

/// Replace settings; applies from the next pass
pub async fn put_settings(
    State(state): State<Arc<ScreenerState>>,
    Json(settings): Json<ScreenerSettings>,
) -> Response {
    match state.update_settings(settings.clone()).await {
        Ok(()) => Json(settings).into_response(),
        Err(e) => from_error(e),
    }
}

pub async fn cache_stats(State(state): State<Arc<ScreenerState>>) -> Json<CacheResponse> {
    Json(CacheResponse {
        size: state.cache.size(),
        stats: state.cache.stats(),
    })
}

pub async fn clear_cache(State(state): State<Arc<ScreenerState>>) -> Json<ClearCacheResponse> {
    let cleared = state.cache.size();
    state.cache.clear();
    tracing::info!(cleared, "Response cache cleared");
    Json(ClearCacheResponse { cleared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::data::{Candle, MarketDataProvider, ProviderError, ResponseCache, Ticker, Timeframe};
    use crate::indicators::CrossDirection;
    use crate::signal::IndicatorSnapshot;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use zero_common::config::Config;

    struct NoMarket;

    #[async_trait]
    impl MarketDataProvider for NoMarket {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn get_candles(&self, _: &str, _: Timeframe, _: usize) -> Result<Vec<Candle>, ProviderError> {
            Ok(Vec::new())
        }

        async fn get_all_tickers(&self) -> Result<Vec<Ticker>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn test_state() -> Arc<ScreenerState> {
        let cache = Arc::new(ResponseCache::new());
        Arc::new(ScreenerState::with_provider(Config::default(), Arc::new(NoMarket), cache).unwrap())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = build_router(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "zero-screener");
    }

    #[tokio::test]
    async fn test_screener_unavailable_before_first_pass() {
        let response = build_router(test_state())
            .oneshot(Request::builder().uri("/api/v1/screener").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_run_then_read() {
        let state = test_state();

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/screener/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["stats"]["totalSymbols"], 0);
        assert_eq!(body["failed"], false);

        let response = build_router(state)
            .oneshot(Request::builder().uri("/api/v1/screener?limit=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["symbols"], json!([]));
    }

    fn screened(symbol: &str, signal: Signal, ranking: usize) -> ScreenedSymbol {
        let neutral = IndicatorSnapshot {
            slow_k: 50.0,
            slow_d: 50.0,
            rsi: 50.0,
        };
        ScreenedSymbol {
            symbol: symbol.to_string(),
            price: 1.0,
            price_change_24h: 0.0,
            price_change_percent_24h: 0.0,
            volume_24h: 24.0,
            volume_1h: 1.0,
            market_cap: 0.0,
            open_interest_24h: 2.4,
            native: neutral,
            mid: neutral,
            high: neutral,
            crossover: CrossDirection::None,
            signal,
            ranking,
        }
    }

    async fn get(state: Arc<ScreenerState>, uri: &str) -> Response {
        build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_screener_query_narrows_result() {
        let state = test_state();
        let now = chrono::Utc::now();
        *state.latest.write().await = Some(ScreenerResult {
            pass_id: "a1b2c3d4".to_string(),
            timeframe: Timeframe::H1,
            symbols: vec![
                screened("AAAUSDT", Signal::Buy, 1),
                screened("BBBUSDT", Signal::Hold, 2),
                screened("CCCUSDT", Signal::Buy, 3),
            ],
            stats: ScreenerStats::default(),
            settings_summary: String::new(),
            started_at: now,
            completed_at: now,
            duration_secs: 0.0,
            failed: false,
        });

        let body = body_json(get(state.clone(), "/api/v1/screener?limit=2").await).await;
        assert_eq!(body["symbols"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["passId"], "a1b2c3d4");

        let body = body_json(get(state.clone(), "/api/v1/screener?signal=buy&limit=1").await).await;
        assert_eq!(body["symbols"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["symbols"][0]["symbol"], "AAAUSDT");

        let body = body_json(get(state.clone(), "/api/v1/screener?signal=BUY").await).await;
        assert_eq!(body["symbols"][1]["symbol"], "CCCUSDT");

        let response = get(state, "/api/v1/screener?signal=moon").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_put_settings_validates() {
        let state = test_state();

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"indicators": {"rsi": {"period": 0}}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"timeframe": "4h", "sortColumn": "rsi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.settings.read().await.timeframe, Timeframe::H4);
    }

    #[tokio::test]
    async fn test_cache_admin() {
        let state = test_state();
        state.cache.put("/ticker/24hr", json!([]));

        let response = build_router(state.clone())
            .oneshot(Request::builder().uri("/api/v1/cache").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["size"], 1);
        assert_eq!(body["active_entries"], 1);

        let response = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/cache")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["cleared"], 1);
        assert_eq!(state.cache.size(), 0);
    }
}
