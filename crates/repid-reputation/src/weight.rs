// crates/repid-reputation/src/weight.rs
//
// Weight calculator: converts a submission plus the rater's current reputation
// into the scalar weight the rating carries in aggregation.
//
//   final = clamp(base * (1 + proof_bonus + context_bonus) * self_factor, 0, max)
//
// Pure and deterministic; persisted component-wise on each rating.

use serde::{Deserialize, Serialize};

use repid_core::{RatingSubmission, WeightBreakdown};

/// Rater reputation at which the base weight saturates at 1.0.
pub const DEFAULT_REPUTATION_CEILING: f64 = 1000.0;

/// Additive bonus for a verified cryptographic proof.
pub const PROOF_BONUS: f64 = 0.5;

/// Additive bonus for a verified contextual justification.
pub const CONTEXT_BONUS: f64 = 0.2;

/// Multiplicative factor applied to self-ratings (an 80% reduction).
pub const SELF_RATING_FACTOR: f64 = 0.2;

/// Upper clamp for the final weight.
pub const MAX_WEIGHT: f64 = 2.0;

/// Tunables for the weight calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightConfig {
    #[serde(default = "default_ceiling")]
    pub reputation_ceiling: f64,
    #[serde(default = "default_proof_bonus")]
    pub proof_bonus: f64,
    #[serde(default = "default_context_bonus")]
    pub context_bonus: f64,
    #[serde(default = "default_self_factor")]
    pub self_rating_factor: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
}

fn default_ceiling() -> f64 {
    DEFAULT_REPUTATION_CEILING
}

fn default_proof_bonus() -> f64 {
    PROOF_BONUS
}

fn default_context_bonus() -> f64 {
    CONTEXT_BONUS
}

fn default_self_factor() -> f64 {
    SELF_RATING_FACTOR
}

fn default_max_weight() -> f64 {
    MAX_WEIGHT
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            reputation_ceiling: default_ceiling(),
            proof_bonus: default_proof_bonus(),
            context_bonus: default_context_bonus(),
            self_rating_factor: default_self_factor(),
            max_weight: default_max_weight(),
        }
    }
}

/// Rater reputation normalized to [0, 1] against the ceiling.
pub fn base_weight(rater_reputation: f64, ceiling: f64) -> f64 {
    if !rater_reputation.is_finite() || ceiling <= 0.0 {
        return 0.0;
    }
    (rater_reputation / ceiling).clamp(0.0, 1.0)
}

/// Compute the weight breakdown for a submission.
///
/// The self-rating factor multiplies the combined weight after bonuses, so a
/// self-rating never carries more than `self_rating_factor` of the weight the
/// same submission would carry as a peer rating.
pub fn compute_weight(
    submission: &RatingSubmission,
    rater_reputation: f64,
    config: &WeightConfig,
) -> WeightBreakdown {
    let base = base_weight(rater_reputation, config.reputation_ceiling);

    let proof_bonus = if submission.has_verified_proof() {
        config.proof_bonus
    } else {
        0.0
    };
    let context_multiplier = if submission.has_context() {
        config.context_bonus
    } else {
        0.0
    };
    let self_penalty = if submission.is_self_rating() {
        config.self_rating_factor
    } else {
        1.0
    };

    let raw = base * (1.0 + proof_bonus + context_multiplier) * self_penalty;
    let final_weight = if raw.is_finite() {
        raw.clamp(0.0, config.max_weight)
    } else {
        0.0
    };

    WeightBreakdown {
        base_weight: base,
        proof_bonus,
        context_multiplier,
        self_penalty,
        final_weight,
    }
}
