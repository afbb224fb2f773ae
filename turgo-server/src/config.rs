use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub content_directory: Option<String>,
    pub round_advance_delay_ms: u64,
    pub countdown_tick_ms: u64,
    pub connection_timeout_seconds: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_refill_ms: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("Invalid PORT"),
            content_directory: env::var("CONTENT_DIRECTORY")
                .ok()
                .filter(|dir| !dir.trim().is_empty()),
            round_advance_delay_ms: env::var("ROUND_ADVANCE_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("Invalid ROUND_ADVANCE_DELAY_MS"),
            countdown_tick_ms: env::var("COUNTDOWN_TICK_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("Invalid COUNTDOWN_TICK_MS"),
            connection_timeout_seconds: env::var("CONNECTION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("Invalid CONNECTION_TIMEOUT_SECONDS"),
            rate_limit_burst: env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("Invalid RATE_LIMIT_BURST"),
            rate_limit_refill_ms: env::var("RATE_LIMIT_REFILL_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .expect("Invalid RATE_LIMIT_REFILL_MS"),
        }
    }

    pub fn round_advance_delay(&self) -> Duration {
        Duration::from_millis(self.round_advance_delay_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn rate_limit_refill(&self) -> Duration {
        Duration::from_millis(self.rate_limit_refill_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
