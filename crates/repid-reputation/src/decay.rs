// crates/repid-reputation/src/decay.rs
//
// Time-decay of rating weights.
//
// A rating's influence shrinks exponentially with its age so that an entity's
// reputation tracks recent behaviour:
//
//   effective = stored * exp(-age_days / tau)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default decay time constant: 90 days.
pub const DEFAULT_TIME_CONSTANT_DAYS: f64 = 90.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Exponential decay with time constant `tau` (in days).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeDecay {
    /// Age at which a weight has fallen to 1/e of its stored value.
    #[serde(default = "default_time_constant")]
    pub time_constant_days: f64,
}

fn default_time_constant() -> f64 {
    DEFAULT_TIME_CONSTANT_DAYS
}

impl Default for TimeDecay {
    fn default() -> Self {
        Self {
            time_constant_days: default_time_constant(),
        }
    }
}

impl TimeDecay {
    pub fn new(time_constant_days: f64) -> Self {
        Self { time_constant_days }
    }

    /// Multiplicative decay factor for a rating `age_days` old.
    ///
    /// Negative ages (clock skew) are treated as zero. A non-positive time
    /// constant decays everything to 0.0.
    pub fn factor(&self, age_days: f64) -> f64 {
        if self.time_constant_days <= 0.0 || !self.time_constant_days.is_finite() {
            return 0.0;
        }
        let age = if age_days.is_finite() { age_days.max(0.0) } else { 0.0 };
        (-age / self.time_constant_days).exp()
    }

    /// Apply decay to a stored weight.
    pub fn apply(&self, weight: f64, age_days: f64) -> f64 {
        weight * self.factor(age_days)
    }
}

/// Fractional age in days between `created_at` and `now`.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds() as f64;
    millis / 1000.0 / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_rating_keeps_full_weight() {
        let decay = TimeDecay::default();
        assert!((decay.apply(0.8, 0.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn one_time_constant_is_one_over_e() {
        let decay = TimeDecay::default();
        let f = decay.factor(DEFAULT_TIME_CONSTANT_DAYS);
        assert!((f - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn ninety_five_days_is_about_point_three_five() {
        let decay = TimeDecay::default();
        let f = decay.factor(95.0);
        assert!((f - (-95.0f64 / 90.0).exp()).abs() < 1e-12);
        assert!((f - 0.348).abs() < 0.001);
    }

    #[test]
    fn old_ratings_never_hit_zero_quickly() {
        let decay = TimeDecay::default();
        assert!(decay.factor(3650.0) > 0.0);
    }

    #[test]
    fn negative_age_is_clamped() {
        let decay = TimeDecay::default();
        assert_eq!(decay.factor(-10.0), 1.0);
    }

    #[test]
    fn zero_time_constant_decays_to_zero() {
        let decay = TimeDecay::new(0.0);
        assert_eq!(decay.apply(1.0, 5.0), 0.0);
    }

    #[test]
    fn age_in_days_is_fractional() {
        let now = Utc::now();
        let age = age_in_days(now - Duration::hours(36), now);
        assert!((age - 1.5).abs() < 1e-9);
    }
}
