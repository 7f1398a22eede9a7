// crates/repid-consensus/src/config.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use repid_reputation::{AggregationConfig, WeightConfig};

/// Engine tunables, loaded from the `[engine]` section of the daemon config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub weight: WeightConfig,
    /// How long a submission waits for the target's aggregation lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound on one submit/recompute attempt, lock wait included.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
    /// Extra attempts after a retryable failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff step between attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Upper bound on one credential refresh, run while the target's lock is held.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    2_000
}

fn default_transaction_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_refresh_timeout_ms() -> u64 {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            weight: WeightConfig::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.aggregation.ema_alpha, 0.2);
        assert_eq!(config.aggregation.bayesian_threshold, 5.0);
        assert_eq!(config.weight.reputation_ceiling, 1000.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.lock_timeout(), Duration::from_secs(2));
        assert_eq!(config.refresh_timeout(), Duration::from_secs(1));
    }
}
