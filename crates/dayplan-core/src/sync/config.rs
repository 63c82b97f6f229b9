//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for the remote store connection.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Remote database URL (e.g., `libsql://your-db.example.io`)
    pub url: String,
    /// Authentication token for the remote database
    pub auth_token: String,
    /// Bound on each connect attempt
    pub connect_timeout: Duration,
    /// Bound applied to every operation on an open connection
    pub query_timeout: Duration,
    /// Retry behavior for `connect`
    pub retry: RetryConfig,
}

impl RemoteConfig {
    /// Create a configuration with the default timeouts and retry policy
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            connect_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-query timeout
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the retry configuration
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .field("connect_timeout", &self.connect_timeout)
            .field("query_timeout", &self.query_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Configuration for connect retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of connect attempts
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each failure
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Creates a new retry configuration
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Creates a configuration with a single attempt and no waiting
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sets the initial delay
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed):
    /// `initial_delay * 2^(attempt-1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_config_defaults() {
        let config = RemoteConfig::new("libsql://tasks.example.io", "secret");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn debug_redacts_auth_token() {
        let config = RemoteConfig::new("libsql://tasks.example.io", "secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn retry_delay_doubles_per_attempt() {
        let retry = RetryConfig::new(3);
        assert_eq!(retry.delay_after(1), Duration::from_millis(1000));
        assert_eq!(retry.delay_after(2), Duration::from_millis(2000));
        assert_eq!(retry.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn retry_delay_respects_max() {
        let retry = RetryConfig::new(10).with_max_delay(Duration::from_secs(5));
        assert_eq!(retry.delay_after(30), Duration::from_secs(5));
    }
}
