// crates/repid-core/src/rating.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entity::EntityRef;
use crate::error::RepIdError;
use crate::MAX_DIMENSION;

/// Declared relationship between rater and target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    /// Rating of another entity.
    #[default]
    Peer,
    /// Rating of oneself. Always weight-penalized.
    #[serde(rename = "self")]
    SelfRating,
    /// Rating issued while disputing a prior claim by the target.
    Challenge,
}

impl RatingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingCategory::Peer => "peer",
            RatingCategory::SelfRating => "self",
            RatingCategory::Challenge => "challenge",
        }
    }
}

impl std::str::FromStr for RatingCategory {
    type Err = RepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peer" => Ok(RatingCategory::Peer),
            "self" => Ok(RatingCategory::SelfRating),
            "challenge" => Ok(RatingCategory::Challenge),
            other => Err(RepIdError::validation(
                "category",
                format!("unknown rating category '{}'", other),
            )),
        }
    }
}

/// The four independent 0-10 sub-scores of a rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionScores {
    pub factual: f64,
    pub truthful: f64,
    pub authentic: f64,
    pub helpful: f64,
}

impl DimensionScores {
    pub fn new(factual: f64, truthful: f64, authentic: f64, helpful: f64) -> Self {
        Self {
            factual,
            truthful,
            authentic,
            helpful,
        }
    }

    /// All four dimensions set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    /// Named view over the dimensions, in canonical order.
    pub fn as_array(&self) -> [(&'static str, f64); 4] {
        [
            ("factual", self.factual),
            ("truthful", self.truthful),
            ("authentic", self.authentic),
            ("helpful", self.helpful),
        ]
    }

    /// Unweighted mean of the four dimensions.
    pub fn mean(&self) -> f64 {
        (self.factual + self.truthful + self.authentic + self.helpful) / 4.0
    }

    /// Whether every dimension sits at the maximum score.
    pub fn is_perfect(&self) -> bool {
        self.as_array().iter().all(|(_, v)| *v >= MAX_DIMENSION)
    }

    /// Reject any dimension outside [0, 10] (NaN included).
    pub fn validate(&self) -> Result<(), RepIdError> {
        for (name, value) in self.as_array() {
            if !value.is_finite() || !(0.0..=MAX_DIMENSION).contains(&value) {
                return Err(RepIdError::validation(
                    name,
                    format!("must be within [0, {}], got {}", MAX_DIMENSION, value),
                ));
            }
        }
        Ok(())
    }
}

/// An incoming rating, before weight computation and screening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub rater: EntityRef,
    pub target: EntityRef,
    pub scores: DimensionScores,
    #[serde(default)]
    pub category: RatingCategory,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Reference to a cryptographic proof backing the rating.
    #[serde(default)]
    pub proof_ref: Option<String>,
    #[serde(default)]
    pub proof_verified: bool,
    /// Reference to a verified contextual justification (scripture, citation, ...).
    #[serde(default)]
    pub context_ref: Option<String>,
    /// Free-text context or evidence supplied by the rater.
    #[serde(default)]
    pub context_note: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl RatingSubmission {
    /// A peer rating with default confidence and no proof or context.
    pub fn new(rater: EntityRef, target: EntityRef, scores: DimensionScores) -> Self {
        Self {
            rater,
            target,
            scores,
            category: RatingCategory::Peer,
            confidence: default_confidence(),
            proof_ref: None,
            proof_verified: false,
            context_ref: None,
            context_note: None,
        }
    }

    pub fn with_category(mut self, category: RatingCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_proof(mut self, proof_ref: impl Into<String>, verified: bool) -> Self {
        self.proof_ref = Some(proof_ref.into());
        self.proof_verified = verified;
        self
    }

    pub fn with_context(mut self, context_ref: impl Into<String>) -> Self {
        self.context_ref = Some(context_ref.into());
        self
    }

    /// Validate ranges and required identity fields.
    pub fn validate(&self) -> Result<(), RepIdError> {
        if self.rater.id <= 0 {
            return Err(RepIdError::validation(
                "rater.id",
                format!("must be a positive id, got {}", self.rater.id),
            ));
        }
        if self.target.id <= 0 {
            return Err(RepIdError::validation(
                "target.id",
                format!("must be a positive id, got {}", self.target.id),
            ));
        }
        self.scores.validate()?;
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(RepIdError::validation(
                "confidence",
                format!("must be within [0, 1], got {}", self.confidence),
            ));
        }
        Ok(())
    }

    fn has_proof_ref(&self) -> bool {
        self.proof_ref.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    /// A verified proof reference is attached. A verified flag with no
    /// reference counts as no proof.
    pub fn has_verified_proof(&self) -> bool {
        self.proof_verified && self.has_proof_ref()
    }

    /// A contextual justification reference is attached.
    pub fn has_context(&self) -> bool {
        self.context_ref.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Self-rating: declared as such, or rater and target are the same entity
    /// regardless of the declared category.
    pub fn is_self_rating(&self) -> bool {
        self.category == RatingCategory::SelfRating || self.rater.same_entity(&self.target)
    }
}

/// Weight components persisted alongside each rating for auditability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeightBreakdown {
    /// Rater reputation normalized to [0, 1].
    pub base_weight: f64,
    /// Additive bonus for a verified proof (0.0 or 0.5).
    pub proof_bonus: f64,
    /// Additive bonus for a contextual justification (0.0 or 0.2).
    pub context_multiplier: f64,
    /// Multiplicative factor: 1.0 for peer ratings, 0.2 for self-ratings.
    pub self_penalty: f64,
    /// Clamped to [0, 2].
    pub final_weight: f64,
}

/// Inline manipulation check that fired on a rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ManipulationKind {
    /// Too many self-ratings by one rater inside the rolling window.
    SelfRatingBurst,
    /// All four dimensions at maximum without a verified proof.
    PerfectUnverified,
}

/// Advisory screening outcome attached to a rating at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ManipulationFlag {
    pub flagged: bool,
    #[serde(default)]
    pub kinds: Vec<ManipulationKind>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ManipulationFlag {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: ManipulationKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// An immutable entry in the Rating Ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    /// Unique identifier (UUID v7 for time-ordering).
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub rater: EntityRef,
    /// Rater's composite score snapshotted at submission time.
    pub rater_reputation: f64,
    pub target: EntityRef,
    pub scores: DimensionScores,
    pub category: RatingCategory,
    pub confidence: f64,
    pub proof_ref: Option<String>,
    pub proof_verified: bool,
    pub context_ref: Option<String>,
    pub context_note: Option<String>,
    pub weight: WeightBreakdown,
    pub manipulation: ManipulationFlag,
    /// Hex SHA-256 over the audited fields, see [`Rating::compute_digest`].
    pub digest: String,
}

impl Rating {
    /// Build the ledger entry for a screened submission.
    pub fn from_submission(
        submission: RatingSubmission,
        rater_reputation: f64,
        weight: WeightBreakdown,
        manipulation: ManipulationFlag,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut rating = Rating {
            id: Uuid::now_v7(),
            created_at,
            rater: submission.rater,
            rater_reputation,
            target: submission.target,
            scores: submission.scores,
            category: submission.category,
            confidence: submission.confidence,
            proof_ref: submission.proof_ref,
            proof_verified: submission.proof_verified,
            context_ref: submission.context_ref,
            context_note: submission.context_note,
            weight,
            manipulation,
            digest: String::new(),
        };
        rating.digest = rating.compute_digest();
        rating
    }

    /// SHA-256(id || created_at_rfc3339 || rater || target || category || scores || weights), hex.
    pub fn compute_digest(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.id.as_bytes());
        hasher.update(self.created_at.to_rfc3339().as_bytes());
        hasher.update(self.rater.key().to_string().as_bytes());
        hasher.update(self.rater_reputation.to_le_bytes());
        hasher.update(self.target.key().to_string().as_bytes());
        hasher.update(self.category.as_str().as_bytes());

        for (_, value) in self.scores.as_array() {
            hasher.update(value.to_le_bytes());
        }

        let w = &self.weight;
        for value in [
            w.base_weight,
            w.proof_bonus,
            w.context_multiplier,
            w.self_penalty,
            w.final_weight,
        ] {
            hasher.update(value.to_le_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Check that the stored digest still matches the audited fields.
    pub fn verify_digest(&self) -> bool {
        self.digest == self.compute_digest()
    }

    pub fn is_self_rating(&self) -> bool {
        self.category == RatingCategory::SelfRating || self.rater.same_entity(&self.target)
    }
}
