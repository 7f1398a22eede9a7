// crates/repid-core/src/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityKey;
use crate::error::RepIdError;
use crate::rating::{DimensionScores, RatingCategory};
use crate::{NEUTRAL_COMPOSITE, NEUTRAL_DIMENSION};

/// Per-dimension weights of the composite score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionWeights {
    pub factual: f64,
    pub truthful: f64,
    pub authentic: f64,
    pub helpful: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            factual: 0.3,
            truthful: 0.3,
            authentic: 0.2,
            helpful: 0.2,
        }
    }
}

impl DimensionWeights {
    /// Tolerance used when checking that the weights sum to 1.0.
    pub const SUM_TOLERANCE: f64 = 1e-6;

    pub fn validate(&self) -> Result<(), RepIdError> {
        let parts = [self.factual, self.truthful, self.authentic, self.helpful];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RepIdError::validation(
                "dimension_weights",
                format!("weights must be finite and non-negative, got {:?}", parts),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(RepIdError::validation(
                "dimension_weights",
                format!("weights must sum to 1.0, got {}", sum),
            ));
        }
        Ok(())
    }

    /// Weighted sum of the dimensions scaled x10 onto the 0-100 composite scale.
    pub fn composite(&self, dims: &DimensionScores) -> f64 {
        (dims.factual * self.factual
            + dims.truthful * self.truthful
            + dims.authentic * self.authentic
            + dims.helpful * self.helpful)
            * 10.0
    }
}

/// Ratings received, broken down by declared category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CategoryCounts {
    pub peer: u64,
    pub self_rating: u64,
    pub challenge: u64,
}

impl CategoryCounts {
    pub fn record(&mut self, category: RatingCategory) {
        match category {
            RatingCategory::Peer => self.peer += 1,
            RatingCategory::SelfRating => self.self_rating += 1,
            RatingCategory::Challenge => self.challenge += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.peer + self.self_rating + self.challenge
    }
}

/// Counters of inline manipulation checks that fired on ratings received.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AnomalyCounters {
    /// Ratings carrying any manipulation flag.
    pub flagged: u64,
    pub self_rating_burst: u64,
    pub perfect_unverified: u64,
}

/// Persisted per-entity reputation record, upserted by the aggregator only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedScore {
    pub entity: EntityKey,
    /// Decay-weighted, prior-blended dimension scores.
    pub dimensions: DimensionScores,
    /// EMA-smoothed composite (0-100). This is the entity's reputation.
    pub composite: f64,
    /// Composite before the latest update. None on the first aggregation.
    pub previous_composite: Option<f64>,
    /// Composite recomputed from the ledger before EMA smoothing.
    pub raw_composite: f64,
    pub weights: DimensionWeights,
    pub total_ratings: u64,
    pub counts: CategoryCounts,
    /// Remaining influence of the neutral prior, in [0, 1].
    pub bayesian_weight: f64,
    /// Share of received ratings that were flagged, 0-100.
    pub manipulation_risk: f64,
    pub anomalies: AnomalyCounters,
    /// Optimistic concurrency version, incremented on every write.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Read model returned by the "get aggregated score" operation.
///
/// Unknown entities resolve to the neutral baseline with `has_ratings = false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreView {
    pub entity: EntityKey,
    pub composite: f64,
    pub dimensions: DimensionScores,
    pub total_ratings: u64,
    pub bayesian_weight: f64,
    pub manipulation_risk: f64,
    pub has_ratings: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScoreView {
    /// Neutral baseline for an entity with no ratings yet.
    pub fn neutral(entity: EntityKey) -> Self {
        Self {
            entity,
            composite: NEUTRAL_COMPOSITE,
            dimensions: DimensionScores::uniform(NEUTRAL_DIMENSION),
            total_ratings: 0,
            bayesian_weight: 1.0,
            manipulation_risk: 0.0,
            has_ratings: false,
            updated_at: None,
        }
    }
}

impl From<&AggregatedScore> for ScoreView {
    fn from(score: &AggregatedScore) -> Self {
        Self {
            entity: score.entity,
            composite: score.composite,
            dimensions: score.dimensions,
            total_ratings: score.total_ratings,
            bayesian_weight: score.bayesian_weight,
            manipulation_risk: score.manipulation_risk,
            has_ratings: score.total_ratings > 0,
            updated_at: Some(score.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;

    #[test]
    fn default_weights_sum_to_one() {
        assert!(DimensionWeights::default().validate().is_ok());
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let w = DimensionWeights {
            factual: 0.5,
            ..DimensionWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let w = DimensionWeights {
            factual: -0.1,
            truthful: 0.7,
            authentic: 0.2,
            helpful: 0.2,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn neutral_dimensions_give_neutral_composite() {
        let c = DimensionWeights::default().composite(&DimensionScores::uniform(NEUTRAL_DIMENSION));
        assert!((c - NEUTRAL_COMPOSITE).abs() < 1e-9);
    }

    #[test]
    fn composite_respects_weights() {
        let dims = DimensionScores::new(10.0, 0.0, 0.0, 0.0);
        let c = DimensionWeights::default().composite(&dims);
        assert!((c - 30.0).abs() < 1e-9);
    }

    #[test]
    fn category_counts_track_each_kind() {
        let mut counts = CategoryCounts::default();
        counts.record(RatingCategory::Peer);
        counts.record(RatingCategory::Peer);
        counts.record(RatingCategory::SelfRating);
        counts.record(RatingCategory::Challenge);
        assert_eq!(counts.peer, 2);
        assert_eq!(counts.self_rating, 1);
        assert_eq!(counts.challenge, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn neutral_view_reports_no_ratings() {
        let view = ScoreView::neutral(EntityKey::new(EntityType::Agent, 5));
        assert!(!view.has_ratings);
        assert_eq!(view.composite, NEUTRAL_COMPOSITE);
        assert_eq!(view.dimensions, DimensionScores::uniform(NEUTRAL_DIMENSION));
    }
}
