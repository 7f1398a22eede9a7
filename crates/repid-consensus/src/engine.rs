// crates/repid-consensus/src/engine.rs
//
// ReputationEngine: the submission pipeline and score read path.
//
// Submission flow:
//   1. Validate the submission (no side effects on failure).
//   2. Resolve the rater's reputation (unknown -> neutral 50.0).
//   3. Compute the weight breakdown.
//   4. Screen against the rater's recent history (advisory flag only).
//   5. Under the target's lock: read the previous row and ledger, aggregate
//      with the new rating appended, commit rating + row atomically.
//   6. Still holding the target's lock, refresh its API credentials
//      (bounded by the refresh timeout; failures are logged, never
//      propagated).
//
// Step 5 runs under a transaction timeout and is retried on Concurrency or
// Timeout errors. The rating id is fixed before the first attempt, so an
// attempt that committed but timed out is recognized on retry. Refreshes for
// one entity are serialized by its lock, so the last refresh always carries
// the last committed composite.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use repid_core::traits::{CredentialRefresher, ReputationLookup, ReputationStore};
use repid_core::{
    AggregatedScore, EntityKey, Rating, RatingSubmission, RepIdError, ScoreView,
    NEUTRAL_COMPOSITE,
};
use repid_detect::{DetectorConfig, ManipulationDetector};
use repid_reputation::{aggregate_ratings, compute_weight, next_score};

use crate::config::EngineConfig;
use crate::locks::EntityLocks;

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitReceipt {
    pub rating_id: Uuid,
    pub target: EntityKey,
    /// Target's composite after this rating was aggregated.
    pub composite: f64,
    pub previous_composite: Option<f64>,
    pub weight: f64,
    pub flagged: bool,
    pub reason: Option<String>,
    /// Credentials refreshed, `None` when no refresher is wired or it failed.
    pub credentials_refreshed: Option<usize>,
}

pub struct ReputationEngine {
    store: Arc<dyn ReputationStore>,
    lookup: Arc<dyn ReputationLookup>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    detector: ManipulationDetector,
    locks: EntityLocks,
    config: EngineConfig,
}

impl ReputationEngine {
    /// Build an engine. Fails if the dimension weights do not sum to 1.
    pub fn new(
        store: Arc<dyn ReputationStore>,
        lookup: Arc<dyn ReputationLookup>,
        config: EngineConfig,
        detector: DetectorConfig,
    ) -> Result<Self, RepIdError> {
        config.aggregation.weights.validate()?;
        Ok(Self {
            store,
            lookup,
            refresher: None,
            detector: ManipulationDetector::new(detector),
            locks: EntityLocks::new(),
            config,
        })
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record a rating and return the target's updated composite.
    pub async fn submit_rating(
        &self,
        submission: RatingSubmission,
    ) -> Result<SubmitReceipt, RepIdError> {
        // Step 1: Validate
        submission.validate()?;
        let now = Utc::now();
        let rater = submission.rater.key();
        let target = submission.target.key();

        // Step 2: Rater reputation
        let rater_reputation = self.rater_reputation(&rater).await?;

        // Step 3: Weight
        let weight = compute_weight(&submission, rater_reputation, &self.config.weight);

        // Step 4: Inline screening
        let recent = self
            .store
            .ratings_by_rater_since(&rater, self.detector.window_start(now))
            .await?;
        let flag = self.detector.screen(&submission, &weight, &recent, now);

        let rating = Rating::from_submission(submission, rater_reputation, weight, flag, now);

        // Step 5: Append + aggregate
        let rating_ref = &rating;
        let (score, guard) = self
            .with_retries("submit_rating", move || self.commit_locked(rating_ref))
            .await?;

        tracing::info!(
            rating = %rating.id,
            rater = %rater,
            target = %target,
            weight = rating.weight.final_weight,
            composite = score.composite,
            flagged = rating.manipulation.flagged,
            "Rating accepted"
        );

        // Step 6: Credential refresh
        let credentials_refreshed = self.refresh_credentials(&target, score.composite).await;
        drop(guard);

        Ok(SubmitReceipt {
            rating_id: rating.id,
            target,
            composite: score.composite,
            previous_composite: score.previous_composite,
            weight: rating.weight.final_weight,
            flagged: rating.manipulation.flagged,
            reason: rating.manipulation.reason.clone(),
            credentials_refreshed,
        })
    }

    /// Current score for `entity`, or the neutral baseline if it has none.
    pub async fn get_aggregated_score(&self, entity: &EntityKey) -> Result<ScoreView, RepIdError> {
        Ok(match self.store.get_score(entity).await? {
            Some(score) => ScoreView::from(&score),
            None => ScoreView::neutral(*entity),
        })
    }

    /// Recompute `entity` from its full ledger.
    ///
    /// Only writes when the ledger holds ratings the stored row has not seen,
    /// so repeated calls with no new data return the same composite.
    pub async fn recompute(&self, entity: &EntityKey) -> Result<ScoreView, RepIdError> {
        let (view, changed, guard) = self
            .with_retries("recompute", move || self.recompute_locked(entity))
            .await?;
        if changed {
            self.refresh_credentials(entity, view.composite).await;
        }
        drop(guard);
        Ok(view)
    }

    /// Rater's composite, resolved to the neutral baseline when unknown.
    pub async fn rater_reputation(&self, rater: &EntityKey) -> Result<f64, RepIdError> {
        Ok(self
            .lookup
            .reputation_of(rater)
            .await?
            .unwrap_or(NEUTRAL_COMPOSITE))
    }

    /// Append and aggregate under the target's lock. The guard is handed back
    /// so the caller can finish the credential refresh before releasing it.
    async fn commit_locked(
        &self,
        rating: &Rating,
    ) -> Result<(AggregatedScore, OwnedMutexGuard<()>), RepIdError> {
        let target = rating.target.key();
        let guard = self
            .locks
            .acquire(&target, self.config.lock_timeout())
            .await?;

        let previous = self.store.get_score(&target).await?;
        if self.store.get_rating(&rating.id).await?.is_some() {
            // An earlier attempt committed before its timeout fired.
            let previous = previous.ok_or_else(|| {
                RepIdError::InvalidState(format!(
                    "rating {} is in the ledger but {} has no score row",
                    rating.id, target
                ))
            })?;
            return Ok((previous, guard));
        }

        let mut history = self.store.ratings_for_target(&target).await?;
        history.insert(0, rating.clone());

        let now = Utc::now();
        let aggregate = aggregate_ratings(&history, now, &self.config.aggregation).ok_or_else(
            || RepIdError::InvalidState(format!("empty history for {} after append", target)),
        )?;
        let score = next_score(
            target,
            aggregate,
            previous.as_ref(),
            &self.config.aggregation,
            now,
        );

        self.store
            .commit_rating(rating, &score, previous.as_ref().map(|p| p.version))
            .await?;
        Ok((score, guard))
    }

    async fn recompute_locked(
        &self,
        entity: &EntityKey,
    ) -> Result<(ScoreView, bool, OwnedMutexGuard<()>), RepIdError> {
        let guard = self
            .locks
            .acquire(entity, self.config.lock_timeout())
            .await?;

        let previous = self.store.get_score(entity).await?;
        let history = self.store.ratings_for_target(entity).await?;
        if history.is_empty() {
            return Ok((ScoreView::neutral(*entity), false, guard));
        }
        if let Some(prev) = &previous {
            if prev.total_ratings == history.len() as u64 {
                return Ok((ScoreView::from(prev), false, guard));
            }
        }

        let now = Utc::now();
        let Some(aggregate) = aggregate_ratings(&history, now, &self.config.aggregation) else {
            return Ok((ScoreView::neutral(*entity), false, guard));
        };
        let score = next_score(
            *entity,
            aggregate,
            previous.as_ref(),
            &self.config.aggregation,
            now,
        );
        self.store
            .put_score(&score, previous.as_ref().map(|p| p.version))
            .await?;

        tracing::info!(
            entity = %entity,
            composite = score.composite,
            total_ratings = score.total_ratings,
            "Score recomputed"
        );
        Ok((ScoreView::from(&score), true, guard))
    }

    /// Run `op` under the transaction timeout, retrying retryable failures
    /// with linear backoff.
    async fn with_retries<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T, RepIdError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepIdError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(self.config.transaction_timeout(), op()).await
            {
                Ok(result) => result,
                Err(_) => Err(RepIdError::Timeout(format!(
                    "{} exceeded {} ms",
                    name, self.config.transaction_timeout_ms
                ))),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(op = name, attempt, error = %e, "Retrying after retryable error");
                    tokio::time::sleep(self.config.retry_backoff() * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn refresh_credentials(&self, entity: &EntityKey, composite: f64) -> Option<usize> {
        let refresher = self.refresher.as_ref()?;
        let refresh = refresher.refresh_credentials(entity, composite);
        let result = match tokio::time::timeout(self.config.refresh_timeout(), refresh).await {
            Ok(result) => result,
            Err(_) => Err(RepIdError::Timeout(format!(
                "exceeded {} ms",
                self.config.refresh_timeout_ms
            ))),
        };
        match result {
            Ok(updated) => Some(updated),
            Err(e) => {
                let err = RepIdError::Downstream(format!("credential refresh for {}: {}", entity, e));
                tracing::warn!(entity = %entity, error = %err, "Credential refresh failed, rating kept");
                None
            }
        }
    }
}
