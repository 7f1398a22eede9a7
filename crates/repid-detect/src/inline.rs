// crates/repid-detect/src/inline.rs
//
// Inline screening of a single submission. Each check is independently
// sufficient to flag:
//   1. Self-rating burst: more than `self_burst_limit` self-ratings by the
//      same rater inside the rolling window.
//   2. Implausible perfection: all four dimensions at 10 with no verified proof.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use repid_core::{ManipulationFlag, ManipulationKind, Rating, RatingSubmission, WeightBreakdown};

/// Tunables for inline screening.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    /// Self-ratings tolerated inside the window before flagging.
    #[serde(default = "default_burst_limit")]
    pub self_burst_limit: usize,
    /// Length of the rolling self-rating window, in hours.
    #[serde(default = "default_burst_window_hours")]
    pub self_burst_window_hours: i64,
}

fn default_burst_limit() -> usize {
    3
}

fn default_burst_window_hours() -> i64 {
    24
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            self_burst_limit: default_burst_limit(),
            self_burst_window_hours: default_burst_window_hours(),
        }
    }
}

/// Stateless screen applied to each incoming rating.
#[derive(Debug, Clone, Default)]
pub struct ManipulationDetector {
    config: DetectorConfig,
}

impl ManipulationDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Start of the rater-history window the caller should fetch for `screen`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.config.self_burst_window_hours)
    }

    /// Screen a submission against the rater's recent ledger history.
    ///
    /// `recent_by_rater` may include ratings older than the window; they are ignored.
    pub fn screen(
        &self,
        submission: &RatingSubmission,
        weight: &WeightBreakdown,
        recent_by_rater: &[Rating],
        now: DateTime<Utc>,
    ) -> ManipulationFlag {
        let mut kinds = Vec::new();
        let mut reasons = Vec::new();

        if submission.is_self_rating() {
            let since = self.window_start(now);
            let prior = recent_by_rater
                .iter()
                .filter(|r| r.created_at >= since && r.is_self_rating())
                .count();
            if prior >= self.config.self_burst_limit {
                kinds.push(ManipulationKind::SelfRatingBurst);
                reasons.push(format!(
                    "{} self-ratings within {}h (limit {})",
                    prior + 1,
                    self.config.self_burst_window_hours,
                    self.config.self_burst_limit
                ));
            }
        }

        if submission.scores.is_perfect() && !submission.has_verified_proof() {
            kinds.push(ManipulationKind::PerfectUnverified);
            reasons.push("perfect scores without verified proof".to_string());
        }

        if kinds.is_empty() {
            return ManipulationFlag::clean();
        }

        let reason = reasons.join("; ");
        tracing::warn!(
            "Manipulation flag for rating {} -> {} (weight {:.4}): {}",
            submission.rater,
            submission.target,
            weight.final_weight,
            reason
        );

        ManipulationFlag {
            flagged: true,
            kinds,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repid_core::{DimensionScores, EntityRef, EntityType, RatingCategory};

    fn weight() -> WeightBreakdown {
        WeightBreakdown {
            base_weight: 0.05,
            proof_bonus: 0.0,
            context_multiplier: 0.0,
            self_penalty: 0.2,
            final_weight: 0.01,
        }
    }

    fn self_submission() -> RatingSubmission {
        RatingSubmission::new(
            EntityRef::new(EntityType::User, 1),
            EntityRef::new(EntityType::User, 1),
            DimensionScores::uniform(7.0),
        )
        .with_category(RatingCategory::SelfRating)
    }

    fn past_self_rating(at: DateTime<Utc>) -> Rating {
        Rating::from_submission(self_submission(), 50.0, weight(), ManipulationFlag::clean(), at)
    }

    #[test]
    fn ordinary_peer_rating_is_clean() {
        let detector = ManipulationDetector::default();
        let sub = RatingSubmission::new(
            EntityRef::new(EntityType::User, 1),
            EntityRef::new(EntityType::Agent, 2),
            DimensionScores::uniform(7.0),
        );
        let flag = detector.screen(&sub, &weight(), &[], Utc::now());
        assert!(!flag.flagged);
        assert!(flag.reason.is_none());
    }

    #[test]
    fn fourth_self_rating_in_a_day_is_flagged() {
        let detector = ManipulationDetector::default();
        let now = Utc::now();
        let history: Vec<Rating> = (1..=3)
            .map(|h| past_self_rating(now - Duration::hours(h)))
            .collect();
        let flag = detector.screen(&self_submission(), &weight(), &history, now);
        assert!(flag.flagged);
        assert!(flag.has(ManipulationKind::SelfRatingBurst));
    }

    #[test]
    fn third_self_rating_is_tolerated() {
        let detector = ManipulationDetector::default();
        let now = Utc::now();
        let history: Vec<Rating> = (1..=2)
            .map(|h| past_self_rating(now - Duration::hours(h)))
            .collect();
        let flag = detector.screen(&self_submission(), &weight(), &history, now);
        assert!(!flag.flagged);
    }

    #[test]
    fn self_ratings_outside_window_are_ignored() {
        let detector = ManipulationDetector::default();
        let now = Utc::now();
        let history: Vec<Rating> = (25..=28)
            .map(|h| past_self_rating(now - Duration::hours(h)))
            .collect();
        let flag = detector.screen(&self_submission(), &weight(), &history, now);
        assert!(!flag.flagged);
    }

    #[test]
    fn perfect_unverified_is_flagged() {
        let detector = ManipulationDetector::default();
        let sub = RatingSubmission::new(
            EntityRef::new(EntityType::User, 1),
            EntityRef::new(EntityType::Agent, 2),
            DimensionScores::uniform(10.0),
        );
        let flag = detector.screen(&sub, &weight(), &[], Utc::now());
        assert!(flag.flagged);
        assert!(flag.has(ManipulationKind::PerfectUnverified));
    }

    #[test]
    fn perfect_with_verified_proof_is_clean() {
        let detector = ManipulationDetector::default();
        let sub = RatingSubmission::new(
            EntityRef::new(EntityType::User, 1),
            EntityRef::new(EntityType::Agent, 2),
            DimensionScores::uniform(10.0),
        )
        .with_proof("zkp:ok", true);
        let flag = detector.screen(&sub, &weight(), &[], Utc::now());
        assert!(!flag.flagged);
    }

    #[test]
    fn both_checks_can_fire_together() {
        let detector = ManipulationDetector::default();
        let now = Utc::now();
        let history: Vec<Rating> = (1..=3)
            .map(|h| past_self_rating(now - Duration::hours(h)))
            .collect();
        let mut sub = self_submission();
        sub.scores = DimensionScores::uniform(10.0);
        let flag = detector.screen(&sub, &weight(), &history, now);
        assert_eq!(flag.kinds.len(), 2);
        assert!(flag.reason.unwrap().contains(';'));
    }
}
