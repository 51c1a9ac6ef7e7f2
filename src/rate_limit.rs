//! Minimum-interval gate for external API calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum delay between successive calls.
///
/// All callers share one timestamp. The lock is held across the wait, so
/// concurrent callers queue up and are released one slot at a time.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until at least `min_delay` has passed since the last granted slot.
    pub async fn wait_for_next_slot(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiter holding call");
                tokio::time::sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::from_millis(1_000);
        let start = std::time::Instant::now();
        limiter.wait_for_next_slot().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::from_millis(100);
        limiter.wait_for_next_slot().await;
        let start = std::time::Instant::now();
        limiter.wait_for_next_slot().await;
        assert!(start.elapsed() >= Duration::from_millis(95));
    }

    #[tokio::test]
    async fn test_no_wait_after_interval_passed() {
        let limiter = RateLimiter::from_millis(50);
        limiter.wait_for_next_slot().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let start = std::time::Instant::now();
        limiter.wait_for_next_slot().await;
        assert!(start.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_serialize() {
        let limiter = Arc::new(RateLimiter::from_millis(100));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.wait_for_next_slot().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // first slot free, then two spaced slots
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
