// crates/repid-reputation/src/aggregate.rs
//
// Consensus aggregation over one entity's rating history.
//
// Steps:
//   1. Decay each rating's stored weight by its age.
//   2. Decay-weighted mean per dimension.
//   3. Blend each mean with the neutral prior by the Bayesian weight.
//   4. Weighted composite on the 0-100 scale (the "raw" composite).
//   5. EMA against the previously stored composite (skipped on first write).
//
// Steps 1-4 live in `aggregate_ratings`, step 5 in `next_score`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repid_core::{
    AggregatedScore, AnomalyCounters, CategoryCounts, DimensionScores, DimensionWeights,
    EntityKey, ManipulationKind, Rating, NEUTRAL_DIMENSION,
};

use crate::decay::{age_in_days, TimeDecay};
use crate::smoothing::{
    bayesian_weight, blend_with_prior, ema, DEFAULT_BAYESIAN_THRESHOLD, DEFAULT_EMA_ALPHA,
};

/// Total effective weight below which the history is treated as weightless.
const MIN_WEIGHT_MASS: f64 = 1e-12;

/// Tunables for aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationConfig {
    #[serde(default)]
    pub decay: TimeDecay,
    #[serde(default = "default_alpha")]
    pub ema_alpha: f64,
    #[serde(default = "default_threshold")]
    pub bayesian_threshold: f64,
    #[serde(default)]
    pub weights: DimensionWeights,
}

fn default_alpha() -> f64 {
    DEFAULT_EMA_ALPHA
}

fn default_threshold() -> f64 {
    DEFAULT_BAYESIAN_THRESHOLD
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            decay: TimeDecay::default(),
            ema_alpha: default_alpha(),
            bayesian_threshold: default_threshold(),
            weights: DimensionWeights::default(),
        }
    }
}

/// Result of steps 1-4 over a non-empty history.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub dimensions: DimensionScores,
    pub raw_composite: f64,
    pub bayesian_weight: f64,
    pub total_ratings: u64,
    pub counts: CategoryCounts,
    pub anomalies: AnomalyCounters,
    /// Share of ratings carrying a manipulation flag, 0-100.
    pub manipulation_risk: f64,
    /// Sum of decayed weights. Zero means the neutral prior was used.
    pub weight_mass: f64,
}

/// Aggregate a target's ratings as of `now`. Returns `None` for an empty history.
pub fn aggregate_ratings(
    ratings: &[Rating],
    now: DateTime<Utc>,
    config: &AggregationConfig,
) -> Option<Aggregate> {
    if ratings.is_empty() {
        return None;
    }

    let mut counts = CategoryCounts::default();
    let mut anomalies = AnomalyCounters::default();
    let mut mass = 0.0;
    let mut sums = [0.0_f64; 4];

    for rating in ratings {
        counts.record(rating.category);
        if rating.manipulation.flagged {
            anomalies.flagged += 1;
        }
        if rating.manipulation.has(ManipulationKind::SelfRatingBurst) {
            anomalies.self_rating_burst += 1;
        }
        if rating.manipulation.has(ManipulationKind::PerfectUnverified) {
            anomalies.perfect_unverified += 1;
        }

        let age = age_in_days(rating.created_at, now);
        let effective = config.decay.apply(rating.weight.final_weight, age);
        if !effective.is_finite() || effective <= 0.0 {
            continue;
        }
        mass += effective;
        for (slot, (_, value)) in sums.iter_mut().zip(rating.scores.as_array()) {
            *slot += value * effective;
        }
    }

    let total = ratings.len() as u64;
    let means = if mass > MIN_WEIGHT_MASS {
        DimensionScores::new(
            sums[0] / mass,
            sums[1] / mass,
            sums[2] / mass,
            sums[3] / mass,
        )
    } else {
        DimensionScores::uniform(NEUTRAL_DIMENSION)
    };

    let bw = bayesian_weight(total, config.bayesian_threshold);
    let dimensions = DimensionScores::new(
        blend_with_prior(means.factual, NEUTRAL_DIMENSION, bw),
        blend_with_prior(means.truthful, NEUTRAL_DIMENSION, bw),
        blend_with_prior(means.authentic, NEUTRAL_DIMENSION, bw),
        blend_with_prior(means.helpful, NEUTRAL_DIMENSION, bw),
    );
    let raw_composite = config.weights.composite(&dimensions);

    Some(Aggregate {
        dimensions,
        raw_composite,
        bayesian_weight: bw,
        total_ratings: total,
        counts,
        anomalies,
        manipulation_risk: 100.0 * anomalies.flagged as f64 / total as f64,
        weight_mass: if mass > MIN_WEIGHT_MASS { mass } else { 0.0 },
    })
}

/// Build the row to persist from a fresh aggregate and the previous row, if any.
///
/// The first aggregation persists the raw composite directly; later ones are
/// EMA-smoothed against the previously stored composite.
pub fn next_score(
    entity: EntityKey,
    aggregate: Aggregate,
    previous: Option<&AggregatedScore>,
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> AggregatedScore {
    let composite = match previous {
        Some(prev) => ema(prev.composite, aggregate.raw_composite, config.ema_alpha),
        None => aggregate.raw_composite,
    };

    AggregatedScore {
        entity,
        dimensions: aggregate.dimensions,
        composite,
        previous_composite: previous.map(|p| p.composite),
        raw_composite: aggregate.raw_composite,
        weights: config.weights,
        total_ratings: aggregate.total_ratings,
        counts: aggregate.counts,
        bayesian_weight: aggregate.bayesian_weight,
        manipulation_risk: aggregate.manipulation_risk,
        anomalies: aggregate.anomalies,
        version: previous.map_or(1, |p| p.version + 1),
        updated_at: now,
    }
}
