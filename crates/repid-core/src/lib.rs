// crates/repid-core/src/lib.rs
//
// repid-core: Core types, traits, and error taxonomy for the RepID consensus engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the rating and aggregated-score records, the polymorphic entity
// identity, manipulation alert schema, and the trait seams behind which
// storage, rater lookup, and credential refresh are plugged in.

pub mod alert;
pub mod entity;
pub mod error;
pub mod rating;
pub mod score;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use repid_core::Rating;`

// Entity types
pub use entity::{EntityKey, EntityRef, EntityType};

// Rating types
pub use rating::{
    DimensionScores, ManipulationFlag, ManipulationKind, Rating, RatingCategory,
    RatingSubmission, WeightBreakdown,
};

// Score types
pub use score::{AggregatedScore, AnomalyCounters, CategoryCounts, DimensionWeights, ScoreView};

// Alert types
pub use alert::{AlertEvidence, AlertSeverity, AlertStatus, DetectionMethod, ManipulationAlert};

// Error type
pub use error::RepIdError;

// Traits
pub use traits::{
    AlertStore, CredentialRefresher, RatingLedger, ReputationLookup, ReputationStore, ScoreStore,
};

/// Neutral midpoint used for every dimension of an entity with no ratings.
pub const NEUTRAL_DIMENSION: f64 = 5.0;

/// Neutral composite score (0-100 scale) for an entity with no ratings.
pub const NEUTRAL_COMPOSITE: f64 = 50.0;

/// Upper bound of each dimension score.
pub const MAX_DIMENSION: f64 = 10.0;
