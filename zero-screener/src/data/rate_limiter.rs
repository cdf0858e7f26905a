//! Token bucket rate limiter for upstream request throttling.
//!
//! Binance bans IPs that exceed the request-weight budget, so every outbound
//! call takes a token first. Cache hits never reach the limiter.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket rate limiter.
///
/// Holds at most one second's worth of requests and refills continuously at
/// `requests_per_minute / 60` tokens per second.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` calls on average.
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let refill_per_sec = requests_per_minute.max(1) as f64 / 60.0;
        let capacity = refill_per_sec.ceil().max(1.0);

        Self {
            name: name.into(),
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, sleeping until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64(missing / self.refill_per_sec)
            };

            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for token"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            bucket.last_refill = now;
        }
    }

    /// Burst size of the bucket.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }
}

/// Shared rate limiter that can be cloned.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared rate limiter.
pub fn shared_limiter(name: impl Into<String>, requests_per_minute: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::new(name, requests_per_minute))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_one_second_of_budget() {
        assert_eq!(RateLimiter::new("binance", 1200).capacity(), 20);
        assert_eq!(RateLimiter::new("slow", 30).capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new("test", 180);
        assert_eq!(limiter.capacity(), 3);

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new("test", 60);
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(990));
    }
}
