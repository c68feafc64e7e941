use std::sync::Arc;
use std::time::Duration;

use crate::delay::Delay;
use crate::github::transport::HttpResponse;

const RATE_LIMIT_PHRASE: &str = "rate limit exceeded";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Waits out forge rate limits. A throttled request is recognised by a 403 whose body
/// carries the rate-limit phrase; the wait runs until the reset timestamp plus one second.
pub struct RateLimiter {
    delay: Arc<dyn Delay>,
}

impl RateLimiter {
    pub fn new(delay: Arc<dyn Delay>) -> Self {
        Self { delay }
    }

    pub fn is_rate_limited(response: &HttpResponse) -> bool {
        response.status == 403 && response.body.to_lowercase().contains(RATE_LIMIT_PHRASE)
    }

    /// `max(reset - now, 0) + 1` seconds.
    pub fn wait_duration(reset_at: i64, now: i64) -> Duration {
        Duration::from_secs(reset_at.saturating_sub(now).max(0) as u64 + 1)
    }

    pub async fn wait_for_reset(&self, response: &HttpResponse) {
        let reset_at = response
            .header(RESET_HEADER)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let wait = Self::wait_duration(reset_at, chrono::Utc::now().timestamp());

        tracing::warn!("Rate limit exceeded. Waiting for {} seconds...", wait.as_secs());
        self.delay.sleep(wait).await;
    }
}
