//! Login rate limiter for preventing brute force attacks
//!
//! Attempts are counted per key (the login name). Exceeding the allowance
//! inside one window bans the key for a fixed period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed per window
    pub max_attempts: u32,
    pub window: Duration,
    pub ban_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),
            ban_duration: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Neither the window nor a ban still holds anything for this key
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        let ban_over = self.ban_expires.is_none_or(|expires| now >= expires);
        ban_over && now.duration_since(self.window_start) >= window
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        entries.retain(|_, entry| !entry.is_stale(now, self.config.window));

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.ban_expires = None;
        }

        if now.duration_since(entry.window_start) >= self.config.window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + self.config.ban_duration);
            warn!(
                "Banned login {} for {} seconds",
                key,
                self.config.ban_duration.as_secs()
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget the attempts for `key` after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}
