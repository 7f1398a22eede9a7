// crates/repid-access/src/tier.rs
//
// Composite score -> access tier and effective hourly request limit.
//
// Tier thresholds (composite score):
//   - Basic:     < 50       100 req/hr
//   - Standard:  50 to 99   250 req/hr
//   - Premium:   100 to 199 500 req/hr
//   - Unlimited: >= 200     1,000 req/hr (a label; still capped)
//
// Effective limit = base limit x max(1.0, composite / 100), capped at
// `AccessConfig::hard_ceiling`.

use std::fmt;
use std::str::FromStr;

use repid_core::RepIdError;
use serde::{Deserialize, Serialize};

pub const STANDARD_THRESHOLD: f64 = 50.0;
pub const PREMIUM_THRESHOLD: f64 = 100.0;
pub const UNLIMITED_THRESHOLD: f64 = 200.0;

/// Divisor turning a composite into a limit multiplier.
pub const MULTIPLIER_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    Basic,
    Standard,
    Premium,
    Unlimited,
}

impl AccessTier {
    /// Tier for a composite score. Negative and NaN scores land in Basic.
    pub fn for_score(score: f64) -> Self {
        if score >= UNLIMITED_THRESHOLD {
            AccessTier::Unlimited
        } else if score >= PREMIUM_THRESHOLD {
            AccessTier::Premium
        } else if score >= STANDARD_THRESHOLD {
            AccessTier::Standard
        } else {
            AccessTier::Basic
        }
    }

    /// Requests per hour before the reputation multiplier.
    pub fn base_limit(&self) -> u64 {
        match self {
            AccessTier::Basic => 100,
            AccessTier::Standard => 250,
            AccessTier::Premium => 500,
            AccessTier::Unlimited => 1_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Basic => "basic",
            AccessTier::Standard => "standard",
            AccessTier::Premium => "premium",
            AccessTier::Unlimited => "unlimited",
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = RepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AccessTier::Basic),
            "standard" => Ok(AccessTier::Standard),
            "premium" => Ok(AccessTier::Premium),
            "unlimited" => Ok(AccessTier::Unlimited),
            other => Err(RepIdError::validation(
                "tier",
                format!("unknown access tier '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Upper bound on any effective limit, including the unlimited tier.
    #[serde(default = "default_hard_ceiling")]
    pub hard_ceiling: u64,
    /// Sliding window length for request counting.
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_hard_ceiling() -> u64 {
    10_000
}

fn default_window_secs() -> i64 {
    3_600
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            hard_ceiling: default_hard_ceiling(),
            window_secs: default_window_secs(),
        }
    }
}

/// Derived rate-limit snapshot for one composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateLimit {
    pub score: f64,
    pub tier: AccessTier,
    pub base_limit: u64,
    pub multiplier: f64,
    /// Requests per window after multiplier and ceiling.
    pub effective_limit: u64,
}

/// Compute tier, multiplier and effective limit for `score`.
pub fn rate_limit_for(score: f64, config: &AccessConfig) -> RateLimit {
    let score = if score.is_finite() { score.max(0.0) } else { 0.0 };
    let tier = AccessTier::for_score(score);
    let base_limit = tier.base_limit();
    let multiplier = (score / MULTIPLIER_SCALE).max(1.0);
    let raw = (base_limit as f64 * multiplier).floor();
    let effective_limit = if raw >= config.hard_ceiling as f64 {
        config.hard_ceiling
    } else {
        raw as u64
    };

    RateLimit {
        score,
        tier,
        base_limit,
        multiplier,
        effective_limit,
    }
}
