use otelflow_core::executor::traits::RetryStrategyPlugin;
use otelflow_core::executor::types::RetryConfig;
use std::time::Duration;

/// Error fragments that no amount of retrying will fix.
const FATAL_MARKERS: &[&str] = &[
    "missing credentials",
    "HTTP 400",
    "HTTP 401",
    "HTTP 403",
    "invalid input",
];

fn is_fatal(error: &str) -> bool {
    FATAL_MARKERS.iter().any(|m| error.contains(m))
}

pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        // attempt 1 is the first retry
        let exp = 1u64 << attempt.saturating_sub(1).min(30);
        let delay = self.config.base_delay_ms.saturating_mul(exp);
        Some(Duration::from_millis(delay.min(self.config.max_delay_ms)))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.base_delay_ms.saturating_mul(attempt.max(1) as u64);
        Some(Duration::from_millis(delay.min(self.config.max_delay_ms)))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        is_fatal(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(strategy: &str, base: u64, max: u64, attempts: u32) -> RetryConfig {
        RetryConfig {
            strategy: strategy.to_string(),
            base_delay_ms: base,
            max_delay_ms: max,
            max_attempts: attempts,
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let plugin = ExponentialBackoffPlugin::new(cfg("exponential-backoff", 100, 300, 4));
        assert_eq!(plugin.next_delay(1, "err").unwrap().as_millis(), 100);
        assert_eq!(plugin.next_delay(2, "err").unwrap().as_millis(), 200);
        assert_eq!(plugin.next_delay(3, "err").unwrap().as_millis(), 300);
        assert_eq!(plugin.next_delay(4, "err"), None);
    }

    #[test]
    fn test_linear_backoff() {
        let plugin = LinearRetryPlugin::new(cfg("linear", 50, 200, 4));
        assert_eq!(plugin.next_delay(1, "err").unwrap().as_millis(), 50);
        assert_eq!(plugin.next_delay(3, "err").unwrap().as_millis(), 150);
    }

    #[test]
    fn test_auth_failures_are_not_retried() {
        let plugin = ExponentialBackoffPlugin::new(cfg("exponential-backoff", 1, 1, 3));
        assert!(!plugin.should_retry(1, "completion failed: HTTP 401: invalid x-api-key"));
        assert!(plugin.should_retry(1, "completion failed: HTTP 529: overloaded"));
        assert!(!plugin.should_retry(3, "timed out after 10ms"));
    }
}
