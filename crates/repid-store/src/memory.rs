// crates/repid-store/src/memory.rs
//
// In-memory store implementing the ledger, score, and alert traits.
//
// A single RwLock guards all tables so that `commit_rating` is atomic with
// respect to every reader. Suitable for tests and single-process embedding;
// contents are lost on drop.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use repid_core::error::RepIdError;
use repid_core::traits::{AlertStore, RatingLedger, ReputationStore, ScoreStore};
use repid_core::{AggregatedScore, AlertStatus, EntityKey, ManipulationAlert, Rating};

use crate::{check_version, sort_newest_first};

#[derive(Debug, Default)]
struct Tables {
    ratings: HashMap<Uuid, Rating>,
    by_target: HashMap<EntityKey, Vec<Uuid>>,
    by_rater: HashMap<EntityKey, Vec<Uuid>>,
    scores: HashMap<EntityKey, AggregatedScore>,
    alerts: HashMap<Uuid, ManipulationAlert>,
}

/// In-memory `ReputationStore` + `AlertStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ratings in the ledger.
    pub fn rating_count(&self) -> usize {
        self.tables.read().map(|t| t.ratings.len()).unwrap_or(0)
    }

    /// Number of persisted AggregatedScore rows.
    pub fn score_count(&self) -> usize {
        self.tables.read().map(|t| t.scores.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, RepIdError> {
        self.tables
            .read()
            .map_err(|e| RepIdError::Storage(format!("RwLock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, RepIdError> {
        self.tables
            .write()
            .map_err(|e| RepIdError::Storage(format!("RwLock poisoned: {}", e)))
    }
}

fn collect(tables: &Tables, ids: Option<&Vec<Uuid>>, since: Option<DateTime<Utc>>) -> Vec<Rating> {
    let mut out: Vec<Rating> = ids
        .into_iter()
        .flatten()
        .filter_map(|id| tables.ratings.get(id))
        .filter(|r| since.map_or(true, |s| r.created_at >= s))
        .cloned()
        .collect();
    sort_newest_first(&mut out);
    out
}

#[async_trait]
impl RatingLedger for MemoryStore {
    async fn get_rating(&self, id: &Uuid) -> Result<Option<Rating>, RepIdError> {
        Ok(self.read()?.ratings.get(id).cloned())
    }

    async fn ratings_for_target(&self, target: &EntityKey) -> Result<Vec<Rating>, RepIdError> {
        let tables = self.read()?;
        Ok(collect(&tables, tables.by_target.get(target), None))
    }

    async fn ratings_by_rater_since(
        &self,
        rater: &EntityKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Rating>, RepIdError> {
        let tables = self.read()?;
        Ok(collect(&tables, tables.by_rater.get(rater), Some(since)))
    }

    async fn ratings_since(&self, since: DateTime<Utc>) -> Result<Vec<Rating>, RepIdError> {
        let tables = self.read()?;
        let mut out: Vec<Rating> = tables
            .ratings
            .values()
            .filter(|r| r.created_at >= since)
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn get_score(&self, entity: &EntityKey) -> Result<Option<AggregatedScore>, RepIdError> {
        Ok(self.read()?.scores.get(entity).cloned())
    }

    async fn put_score(
        &self,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError> {
        let mut tables = self.write()?;
        let current = tables.scores.get(&score.entity).map(|s| s.version);
        check_version(&score.entity, current, expected_version)?;
        tables.scores.insert(score.entity, score.clone());
        Ok(())
    }
}

#[async_trait]
impl ReputationStore for MemoryStore {
    async fn commit_rating(
        &self,
        rating: &Rating,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError> {
        let mut tables = self.write()?;
        if tables.ratings.contains_key(&rating.id) {
            return Err(RepIdError::InvalidState(format!(
                "rating {} already in ledger",
                rating.id
            )));
        }
        let current = tables.scores.get(&score.entity).map(|s| s.version);
        check_version(&score.entity, current, expected_version)?;

        tables.ratings.insert(rating.id, rating.clone());
        tables
            .by_target
            .entry(rating.target.key())
            .or_default()
            .push(rating.id);
        tables
            .by_rater
            .entry(rating.rater.key())
            .or_default()
            .push(rating.id);
        tables.scores.insert(score.entity, score.clone());
        Ok(())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn save_alert(&self, alert: &ManipulationAlert) -> Result<(), RepIdError> {
        self.write()?.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn get_alert(&self, id: &Uuid) -> Result<Option<ManipulationAlert>, RepIdError> {
        Ok(self.read()?.alerts.get(id).cloned())
    }

    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<ManipulationAlert>, RepIdError> {
        let tables = self.read()?;
        let mut out: Vec<ManipulationAlert> = tables
            .alerts
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn has_fingerprint(&self, fingerprint: &str) -> Result<bool, RepIdError> {
        Ok(self
            .read()?
            .alerts
            .values()
            .any(|a| a.fingerprint == fingerprint))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use repid_core::{
        AlertEvidence, AlertSeverity, AnomalyCounters, CategoryCounts, DetectionMethod,
        DimensionScores, DimensionWeights, EntityRef, EntityType, ManipulationFlag,
        RatingSubmission, WeightBreakdown,
    };

    pub(crate) fn make_rating(rater: i64, target: i64, at: DateTime<Utc>) -> Rating {
        let sub = RatingSubmission::new(
            EntityRef::new(EntityType::User, rater),
            EntityRef::new(EntityType::Agent, target),
            DimensionScores::uniform(7.0),
        );
        let weight = WeightBreakdown {
            base_weight: 0.05,
            proof_bonus: 0.0,
            context_multiplier: 0.0,
            self_penalty: 1.0,
            final_weight: 0.05,
        };
        Rating::from_submission(sub, 50.0, weight, ManipulationFlag::clean(), at)
    }

    pub(crate) fn make_score(entity: EntityKey, version: u64) -> AggregatedScore {
        AggregatedScore {
            entity,
            dimensions: DimensionScores::uniform(6.0),
            composite: 60.0,
            previous_composite: None,
            raw_composite: 60.0,
            weights: DimensionWeights::default(),
            total_ratings: version,
            counts: CategoryCounts::default(),
            bayesian_weight: 0.8,
            manipulation_risk: 0.0,
            anomalies: AnomalyCounters::default(),
            version,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn make_alert(fingerprint: &str, at: DateTime<Utc>) -> ManipulationAlert {
        ManipulationAlert {
            id: Uuid::now_v7(),
            fingerprint: fingerprint.to_string(),
            method: DetectionMethod::RatingSpike,
            severity: AlertSeverity::High,
            entities: vec![EntityKey::new(EntityType::Agent, 1)],
            evidence: AlertEvidence::RatingSpike {
                window_count: 30,
                baseline_mean: 1.0,
                baseline_stddev: 1.0,
                z_score: 29.0,
            },
            status: AlertStatus::Pending,
            reviewer: None,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn commit_makes_rating_and_score_visible() {
        let store = MemoryStore::new();
        let rating = make_rating(1, 2, Utc::now());
        let target = rating.target.key();
        store
            .commit_rating(&rating, &make_score(target, 1), None)
            .await
            .unwrap();

        assert!(store.get_rating(&rating.id).await.unwrap().is_some());
        assert_eq!(store.ratings_for_target(&target).await.unwrap().len(), 1);
        assert_eq!(store.get_score(&target).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn version_mismatch_leaves_nothing_behind() {
        let store = MemoryStore::new();
        let first = make_rating(1, 2, Utc::now());
        let target = first.target.key();
        store
            .commit_rating(&first, &make_score(target, 1), None)
            .await
            .unwrap();

        // Stale writer still believes no row exists.
        let second = make_rating(3, 2, Utc::now());
        let err = store
            .commit_rating(&second, &make_score(target, 1), None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(store.get_rating(&second.id).await.unwrap().is_none());
        assert_eq!(store.rating_count(), 1);
    }

    #[tokio::test]
    async fn target_ratings_are_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = make_rating(1, 2, now - Duration::days(3));
        let new = make_rating(3, 2, now);
        let target = old.target.key();
        store.commit_rating(&old, &make_score(target, 1), None).await.unwrap();
        store
            .commit_rating(&new, &make_score(target, 2), Some(1))
            .await
            .unwrap();

        let ratings = store.ratings_for_target(&target).await.unwrap();
        assert_eq!(ratings[0].id, new.id);
        assert_eq!(ratings[1].id, old.id);
    }

    #[tokio::test]
    async fn rater_window_filters_by_time() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let rater = EntityKey::new(EntityType::User, 1);
        let a = make_rating(1, 2, now - Duration::hours(30));
        let b = make_rating(1, 3, now - Duration::hours(2));
        store
            .commit_rating(&a, &make_score(a.target.key(), 1), None)
            .await
            .unwrap();
        store
            .commit_rating(&b, &make_score(b.target.key(), 1), None)
            .await
            .unwrap();

        let recent = store
            .ratings_by_rater_since(&rater, now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, b.id);
        assert_eq!(store.ratings_since(now - Duration::days(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn alerts_filter_and_fingerprint() {
        let store = MemoryStore::new();
        let mut alert = make_alert("fp-1", Utc::now());
        store.save_alert(&alert).await.unwrap();
        assert!(store.has_fingerprint("fp-1").await.unwrap());
        assert!(!store.has_fingerprint("fp-2").await.unwrap());

        alert
            .transition(AlertStatus::UnderReview, None, None, Utc::now())
            .unwrap();
        store.save_alert(&alert).await.unwrap();

        assert!(store
            .list_alerts(Some(AlertStatus::Pending))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .list_alerts(Some(AlertStatus::UnderReview))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
