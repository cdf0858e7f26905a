//! Response cache for market data.
//!
//! Short-TTL memoization of raw upstream payloads, keyed by request
//! signature. Entries are never evicted on expiry: an expired entry is still
//! served as last-known-good when the live call fails. Only `clear` removes
//! entries, so the map grows with the set of distinct requests.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Cache entry with its fetch time
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(payload: Value) -> Self {
        Self {
            payload,
            fetched_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.fetched_at >= ttl
    }
}

/// Upstream response cache.
///
/// Safe for concurrent lookups and inserts; concurrent population of the
/// same key is last-writer-wins.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

/// Cache shared between the fetcher and the diagnostics surface.
pub type SharedCache = Arc<ResponseCache>;

impl ResponseCache {
    /// Create a new cache with the default 60 second TTL
    pub fn new() -> Self {
        Self::with_ttl(60)
    }

    /// Create with custom TTL
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Canonical request signature: endpoint plus parameters sorted by name.
    ///
    /// `request_key("/klines", &[("symbol", "BTCUSDT"), ("interval", "1h")])`
    /// yields `"/klines?interval=1h&symbol=BTCUSDT"`.
    pub fn request_key(endpoint: &str, params: &[(&str, String)]) -> String {
        if params.is_empty() {
            return endpoint.to_string();
        }

        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let query = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", endpoint, query)
    }

    /// Get a cached payload if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().ok()?;

        entries.get(key).and_then(|entry| {
            if entry.is_expired(self.ttl) {
                None
            } else {
                Some(entry.payload.clone())
            }
        })
    }

    /// Get a cached payload regardless of age.
    pub fn get_stale(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Store a payload, stamping it with the current time.
    pub fn put(&self, key: impl Into<String>, payload: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), CacheEntry::new(payload));
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn size(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let (total, expired) = self
            .entries
            .read()
            .map(|entries| {
                let total = entries.len();
                let expired = entries.values().filter(|e| e.is_expired(self.ttl)).count();
                (total, expired)
            })
            .unwrap_or((0, 0));

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

// ============================================================================
// Tests
// ============================================================================
