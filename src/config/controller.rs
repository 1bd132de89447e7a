//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_METRICS_PORT,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RATE_LIMIT_BASE_DELAY_MS, DEFAULT_RATE_LIMIT_MAX_RETRIES,
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_UPSTREAM_ENDPOINT, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How long an upstream read stays valid in the response cache (seconds)
    pub cache_ttl_secs: u64,
    /// Retries for rate-limited upstream calls (total attempts = retries + 1)
    pub rate_limit_max_retries: u32,
    /// Base delay of the rate-limit back-off (milliseconds)
    pub rate_limit_base_delay_ms: u64,
    /// Maximum concurrent reconciles per resource kind
    /// Fixed limit, not elastic
    pub max_concurrent_reconciles: u16,
    /// Requeue interval for converged resources (seconds)
    pub poll_interval_secs: u64,
    /// Deadline for a single reconcile tick (seconds)
    pub reconcile_timeout_secs: u64,
    /// Delay before restarting a controller stream that ended (seconds)
    pub watch_restart_delay_secs: u64,
    /// HTTP server port for metrics and probes
    pub metrics_port: u16,
    /// Upstream endpoint used when a `ProviderConfig` does not set one
    pub upstream_endpoint: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            rate_limit_max_retries: DEFAULT_RATE_LIMIT_MAX_RETRIES,
            rate_limit_base_delay_ms: DEFAULT_RATE_LIMIT_BASE_DELAY_MS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            upstream_endpoint: DEFAULT_UPSTREAM_ENDPOINT.to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            cache_ttl_secs: env_var_or_default("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            rate_limit_max_retries: env_var_or_default(
                "RATE_LIMIT_MAX_RETRIES",
                DEFAULT_RATE_LIMIT_MAX_RETRIES,
            ),
            rate_limit_base_delay_ms: env_var_or_default(
                "RATE_LIMIT_BASE_DELAY_MS",
                DEFAULT_RATE_LIMIT_BASE_DELAY_MS,
            ),
            max_concurrent_reconciles: env_var_or_default(
                "MAX_CONCURRENT_RECONCILES",
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            ),
            poll_interval_secs: env_var_or_default(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            ),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            upstream_endpoint: env_var_or_default_str(
                "UPSTREAM_ENDPOINT",
                DEFAULT_UPSTREAM_ENDPOINT,
            ),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
        }
    }

    /// Get response cache TTL duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Get rate-limit base delay duration
    pub fn rate_limit_base_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_base_delay_ms)
    }

    /// Get poll interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Get reconcile deadline duration
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = ControllerConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.rate_limit_max_retries, 3);
        assert_eq!(config.rate_limit_base_delay(), Duration::from_millis(1000));
        assert_eq!(config.max_concurrent_reconciles, 10);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_env_var_or_default_falls_back_on_garbage() {
        std::env::set_var("EDGE_TEST_GARBAGE_U32", "not-a-number");
        assert_eq!(env_var_or_default("EDGE_TEST_GARBAGE_U32", 7u32), 7);
        std::env::remove_var("EDGE_TEST_GARBAGE_U32");
    }

    #[test]
    fn test_env_var_or_default_parses_value() {
        std::env::set_var("EDGE_TEST_PARSED_U64", "45");
        assert_eq!(env_var_or_default("EDGE_TEST_PARSED_U64", 1u64), 45);
        std::env::remove_var("EDGE_TEST_PARSED_U64");
    }
}
