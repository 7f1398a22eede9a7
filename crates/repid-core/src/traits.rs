// crates/repid-core/src/traits.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::alert::{AlertStatus, ManipulationAlert};
use crate::entity::EntityKey;
use crate::error::RepIdError;
use crate::rating::Rating;
use crate::score::AggregatedScore;

/// Append-only log of rating submissions.
///
/// Implemented by repid-store (in-memory and RocksDB backends). There is no
/// update or delete: ratings enter the ledger through
/// [`ReputationStore::commit_rating`] together with their aggregation.
#[async_trait]
pub trait RatingLedger: Send + Sync {
    /// Retrieve a rating by its UUID.
    async fn get_rating(&self, id: &Uuid) -> Result<Option<Rating>, RepIdError>;

    /// All ratings received by `target`, newest first.
    async fn ratings_for_target(&self, target: &EntityKey) -> Result<Vec<Rating>, RepIdError>;

    /// Ratings issued by `rater` at or after `since`, newest first.
    async fn ratings_by_rater_since(
        &self,
        rater: &EntityKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Rating>, RepIdError>;

    /// Every rating created at or after `since`, newest first. Used by the batch sweep.
    async fn ratings_since(&self, since: DateTime<Utc>) -> Result<Vec<Rating>, RepIdError>;
}

/// Per-entity aggregated reputation rows.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Fetch the row for `entity`, if one was ever written.
    async fn get_score(&self, entity: &EntityKey) -> Result<Option<AggregatedScore>, RepIdError>;

    /// Upsert a row with an optimistic version check.
    ///
    /// `expected_version` is the version the caller read (`None` when no row
    /// existed). A mismatch returns `RepIdError::Concurrency`.
    async fn put_score(
        &self,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError>;
}

/// Combined ledger + score store with an atomic submission commit.
#[async_trait]
pub trait ReputationStore: RatingLedger + ScoreStore {
    /// Append `rating` and upsert `score` as one unit: either both become
    /// visible or neither does. Same version semantics as [`ScoreStore::put_score`].
    async fn commit_rating(
        &self,
        rating: &Rating,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError>;
}

/// Persistence for manipulation alerts produced by the batch sweep.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert or update an alert by id.
    async fn save_alert(&self, alert: &ManipulationAlert) -> Result<(), RepIdError>;

    async fn get_alert(&self, id: &Uuid) -> Result<Option<ManipulationAlert>, RepIdError>;

    /// List alerts, optionally filtered by status, newest first.
    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<ManipulationAlert>, RepIdError>;

    /// Whether an alert with this fingerprint was already recorded.
    async fn has_fingerprint(&self, fingerprint: &str) -> Result<bool, RepIdError>;
}

/// Source of a rater's current composite score.
///
/// Returns `Ok(None)` for entities it knows nothing about; callers resolve
/// that to the neutral baseline.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn reputation_of(&self, entity: &EntityKey) -> Result<Option<f64>, RepIdError>;
}

/// Refreshes cached rate-limit data on an entity's active API credentials.
///
/// Failures never roll back the rating that triggered the refresh.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Returns the number of credentials updated.
    async fn refresh_credentials(
        &self,
        entity: &EntityKey,
        composite: f64,
    ) -> Result<usize, RepIdError>;
}
