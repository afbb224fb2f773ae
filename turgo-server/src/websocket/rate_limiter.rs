use std::time::{Duration, Instant};

use crate::config::Config;

/// Token bucket for one connection's inbound messages.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::new_with_limits(30, Duration::from_millis(500))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new_with_limits(config.rate_limit_burst, config.rate_limit_refill())
    }

    /// Fresh bucket with the same limits, for a new connection
    pub fn fresh(&self) -> Self {
        Self::new_with_limits(self.max_tokens, self.refill_rate)
    }

    pub async fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let refill_ms = self.refill_rate.as_millis().max(1);
        let elapsed_ms = self.last_refill.elapsed().as_millis();
        let tokens_to_add = elapsed_ms / refill_ms;

        if tokens_to_add > 0 {
            let tokens_to_add = u32::try_from(tokens_to_add).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.max_tokens);
            // A partial interval still counts toward the next token unless the bucket is full
            self.last_refill = if self.tokens == self.max_tokens {
                Instant::now()
            } else {
                self.last_refill + self.refill_rate * tokens_to_add
            };
        }
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens();
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_reject() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(60));

        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);
        assert_eq!(limiter.get_remaining_tokens(), 0);
    }

    #[tokio::test]
    async fn test_refill_over_time() {
        let mut limiter = RateLimiter::new_with_limits(2, Duration::from_millis(10));

        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check_rate_limit().await);
        // Refill never exceeds the burst size
        assert!(limiter.get_remaining_tokens() <= 2);
    }

    #[test]
    fn test_fresh_copies_limits() {
        let mut template = RateLimiter::new_with_limits(5, Duration::from_secs(60));
        let fresh = template.fresh();
        assert_eq!(fresh.max_tokens, 5);
        assert_eq!(fresh.refill_rate, Duration::from_secs(60));
        assert_eq!(template.get_remaining_tokens(), 5);
    }
}
