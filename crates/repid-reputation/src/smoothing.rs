// crates/repid-reputation/src/smoothing.rs
//
// The two smoothing steps of aggregation, kept apart so that tau (decay) and
// alpha (EMA) can be tuned independently:
//
//   - Bayesian prior blend: pulls sparse entities toward the neutral midpoint
//     until enough ratings accumulate.
//   - EMA: damps the persisted composite across successive recomputations.

/// Default rating count at which the neutral prior stops contributing.
pub const DEFAULT_BAYESIAN_THRESHOLD: f64 = 5.0;

/// Default EMA smoothing factor.
pub const DEFAULT_EMA_ALPHA: f64 = 0.2;

/// Remaining influence of the prior: `max(0, 1 - count / threshold)`.
pub fn bayesian_weight(rating_count: u64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.0;
    }
    (1.0 - rating_count as f64 / threshold).clamp(0.0, 1.0)
}

/// Blend an observed mean with the prior: `mean * (1 - w) + prior * w`.
pub fn blend_with_prior(mean: f64, prior: f64, weight: f64) -> f64 {
    let w = weight.clamp(0.0, 1.0);
    mean * (1.0 - w) + prior * w
}

/// Exponential moving average: `alpha * current + (1 - alpha) * previous`.
///
/// `alpha` is clamped to [0, 1], so the result always lies between `previous`
/// and `current` inclusive.
pub fn ema(previous: f64, current: f64, alpha: f64) -> f64 {
    let a = alpha.clamp(0.0, 1.0);
    a * current + (1.0 - a) * previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bayesian_weight_steps() {
        assert!((bayesian_weight(0, 5.0) - 1.0).abs() < 1e-12);
        assert!((bayesian_weight(1, 5.0) - 0.8).abs() < 1e-12);
        assert!((bayesian_weight(4, 5.0) - 0.2).abs() < 1e-12);
        assert_eq!(bayesian_weight(5, 5.0), 0.0);
        assert_eq!(bayesian_weight(50, 5.0), 0.0);
    }

    #[test]
    fn single_rating_of_eight_blends_to_five_point_six() {
        let blended = blend_with_prior(8.0, 5.0, bayesian_weight(1, 5.0));
        assert!((blended - 5.6).abs() < 1e-12);
    }

    #[test]
    fn ema_moves_a_fifth_of_the_way() {
        assert!((ema(50.0, 100.0, 0.2) - 60.0).abs() < 1e-12);
    }

    #[test]
    fn ema_alpha_is_clamped() {
        assert_eq!(ema(10.0, 20.0, 3.0), 20.0);
        assert_eq!(ema(10.0, 20.0, -1.0), 10.0);
    }

    proptest! {
        #[test]
        fn prop_ema_stays_between_endpoints(
            previous in 0.0f64..=100.0,
            current in 0.0f64..=100.0,
            alpha in 0.001f64..0.999,
        ) {
            let next = ema(previous, current, alpha);
            let lo = previous.min(current);
            let hi = previous.max(current);
            prop_assert!(next >= lo - 1e-9 && next <= hi + 1e-9);
        }

        #[test]
        fn prop_bayesian_weight_non_increasing(count in 0u64..1000) {
            let now = bayesian_weight(count, DEFAULT_BAYESIAN_THRESHOLD);
            let next = bayesian_weight(count + 1, DEFAULT_BAYESIAN_THRESHOLD);
            prop_assert!(next <= now);
            prop_assert!((0.0..=1.0).contains(&now));
        }
    }
}
