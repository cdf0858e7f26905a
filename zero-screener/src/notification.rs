//! Outbound signal alerts.
//!
//! Notable signals from a pass are offered to an [`AlertSink`]. The default
//! sink posts Markdown messages to the zero-channels send endpoint, which
//! forwards them to Telegram or another configured channel. Delivery runs
//! detached from the pass and every failure is logged and swallowed.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zero_common::config::NotificationConfig;

use crate::data::Timeframe;
use crate::screener::ScreenedSymbol;
use crate::signal::Signal;

// ============================================================================
// Alert Payload
// ============================================================================

/// One notable signal, as offered for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub signal: Signal,
    pub price: f64,
    pub rsi: f64,
    #[serde(rename = "rsiMTF")]
    pub rsi_mtf: f64,
    #[serde(rename = "rsiHTF")]
    pub rsi_htf: f64,
    /// Produced while the universe was restricted to the allow list
    pub restricted: bool,
}

impl Alert {
    pub fn from_symbol(symbol: &ScreenedSymbol, timeframe: Timeframe, restricted: bool) -> Self {
        Self {
            symbol: symbol.symbol.clone(),
            timeframe,
            signal: symbol.signal,
            price: symbol.price,
            rsi: symbol.native.rsi,
            rsi_mtf: symbol.mid.rsi,
            rsi_htf: symbol.high.rsi,
            restricted,
        }
    }

    /// TradingView perpetual chart link.
    pub fn chart_url(&self) -> String {
        format!("https://www.tradingview.com/chart/?symbol={}.P", self.symbol)
    }

    /// Render as a Markdown message.
    pub fn to_markdown(&self) -> String {
        let icon = if self.signal.is_bullish() {
            "🟢"
        } else if self.signal.is_bearish() {
            "🔴"
        } else {
            "⚪️"
        };
        let tag = if self.restricted { " [restricted]" } else { "" };

        format!(
            "📊 *Crypto Signal Alert*{tag}\n\
             ───────────────\n\
             💎 Symbol: *{symbol}* ({tf})\n\
             💲 Price: {price}\n\
             {icon} Direction: *{signal}*\n\
             🔹 RSI: {rsi:.2}\n\
             🔹 RSI MTF: {mtf:.2}\n\
             🔹 RSI HTF: {htf:.2}\n\
             ───────────────\n\
             🔗 [Open in TradingView]({url})",
            tag = tag,
            symbol = self.symbol,
            tf = self.timeframe,
            price = self.price,
            icon = icon,
            signal = self.signal.as_str().replace('_', " "),
            rsi = self.rsi,
            mtf = self.rsi_mtf,
            htf = self.rsi_htf,
            url = self.chart_url(),
        )
    }
}

// ============================================================================
// Alert Sink
// ============================================================================

/// Destination for alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Whether alerts for `signal` should be offered at all.
    fn accepts(&self, signal: Signal) -> bool;

    async fn deliver(&self, alert: &Alert) -> Result<()>;
}

// ============================================================================
// zero-channels Client
// ============================================================================

/// Request to send a message via zero-channels
#[derive(Debug, Serialize)]
struct SendRequest {
    channel_type: String,
    channel_id: String,
    content: SendContent,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SendContent {
    Markdown { text: String },
}

/// Response from zero-channels
#[derive(Debug, Deserialize)]
struct SendResponse {
    success: bool,
    error: Option<String>,
}

/// Posts alerts to the zero-channels service.
pub struct NotificationClient {
    enabled: bool,
    channels_endpoint: String,
    channel_type: String,
    channel_id: String,
    retry_count: u32,
    notable: Vec<Signal>,
    client: reqwest::Client,
}

impl NotificationClient {
    pub fn new(config: &NotificationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let notable = config
            .notable_signals
            .iter()
            .filter_map(|name| {
                let parsed = Signal::parse(name);
                if parsed.is_none() {
                    tracing::warn!(signal = %name, "Ignoring unknown notable signal");
                }
                parsed
            })
            .collect();

        Self {
            enabled: config.enabled,
            channels_endpoint: config.endpoint.trim_end_matches('/').to_string(),
            channel_type: config.channel_type.clone(),
            channel_id: config.channel_id.clone(),
            retry_count: config.retry_count.max(1),
            notable,
            client,
        }
    }

    /// Check if notifications are enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.channel_id.is_empty()
    }

    /// Send a Markdown message, retrying with linear backoff.
    pub async fn send_message(&self, message: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let url = format!("{}/api/v1/send", self.channels_endpoint);
        let request = SendRequest {
            channel_type: self.channel_type.clone(),
            channel_id: self.channel_id.clone(),
            content: SendContent::Markdown {
                text: message.to_string(),
            },
        };

        let mut last_error = None;

        for attempt in 1..=self.retry_count {
            match self.try_send(&url, &request).await {
                Ok(()) => {
                    tracing::info!(
                        channel_type = %self.channel_type,
                        channel_id = %self.channel_id,
                        "Signal alert sent"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.retry_count,
                        error = %e,
                        "Failed to send alert, retrying..."
                    );
                    last_error = Some(e);

                    if attempt < self.retry_count {
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }

    async fn try_send(&self, url: &str, request: &SendRequest) -> Result<()> {
        let response = self.client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {}", status, error_text);
        }

        let result: SendResponse = response.json().await?;

        if result.success {
            Ok(())
        } else {
            anyhow::bail!(
                "Send failed: {}",
                result.error.unwrap_or_else(|| "Unknown error".to_string())
            )
        }
    }
}

#[async_trait]
impl AlertSink for NotificationClient {
    fn accepts(&self, signal: Signal) -> bool {
        self.is_enabled() && self.notable.contains(&signal)
    }

    async fn deliver(&self, alert: &Alert) -> Result<()> {
        self.send_message(&alert.to_markdown()).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert(signal: Signal) -> Alert {
        Alert {
            symbol: "SOLUSDT".to_string(),
            timeframe: Timeframe::H1,
            signal,
            price: 142.5,
            rsi: 24.456,
            rsi_mtf: 55.0,
            rsi_htf: 61.129,
            restricted: false,
        }
    }

    fn enabled_config(endpoint: String) -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            endpoint,
            channel_id: "483286201".to_string(),
            retry_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_by_default() {
        let client = NotificationClient::new(&NotificationConfig::default());
        assert!(!client.is_enabled());
        assert!(!client.accepts(Signal::UltraBuy));
    }

    #[test]
    fn test_accepts_only_notable() {
        let client = NotificationClient::new(&enabled_config("http://localhost".into()));
        assert!(client.accepts(Signal::StrongSell));
        assert!(client.accepts(Signal::UltraBuy));
        assert!(!client.accepts(Signal::Buy));
        assert!(!client.accepts(Signal::Hold));
    }

    #[test]
    fn test_markdown_contents() {
        let text = alert(Signal::UltraBuy).to_markdown();
        assert!(text.contains("*SOLUSDT* (1h)"));
        assert!(text.contains("🟢 Direction: *ULTRA BUY*"));
        assert!(text.contains("RSI: 24.46"));
        assert!(text.contains("RSI HTF: 61.13"));
        assert!(text.contains("https://www.tradingview.com/chart/?symbol=SOLUSDT.P"));
        assert!(!text.contains("[restricted]"));

        let mut restricted = alert(Signal::StrongSell);
        restricted.restricted = true;
        let text = restricted.to_markdown();
        assert!(text.contains("[restricted]"));
        assert!(text.contains("🔴"));
    }

    #[tokio::test]
    async fn test_deliver_posts_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/send"))
            .and(body_partial_json(json!({
                "channel_type": "telegram",
                "channel_id": "483286201",
                "content": {"type": "markdown"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotificationClient::new(&enabled_config(server.uri()));
        client.deliver(&alert(Signal::UltraBuy)).await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/send"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let client = NotificationClient::new(&enabled_config(server.uri()));
        assert!(client.deliver(&alert(Signal::UltraSell)).await.is_err());
    }
}
