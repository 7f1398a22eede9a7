// crates/repid-consensus/src/sweep_job.rs
//
// Periodic manipulation sweep and alert review.
//
// The sweep reads the recent ledger, runs the batch detectors, and appends
// alerts whose fingerprint has not been seen yet. It never touches ratings
// or scores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use repid_core::traits::{AlertStore, RatingLedger};
use repid_core::{AlertStatus, ManipulationAlert, RepIdError};
use repid_detect::sweep::sweep;
use repid_detect::SweepConfig;

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub ratings_scanned: usize,
    pub alerts_raised: usize,
    /// Findings dropped because the same fingerprint was already recorded.
    pub duplicates_suppressed: usize,
    pub alert_ids: Vec<Uuid>,
}

pub struct ManipulationSweep {
    ledger: Arc<dyn RatingLedger>,
    alerts: Arc<dyn AlertStore>,
    config: SweepConfig,
}

impl ManipulationSweep {
    pub fn new(
        ledger: Arc<dyn RatingLedger>,
        alerts: Arc<dyn AlertStore>,
        config: SweepConfig,
    ) -> Self {
        Self {
            ledger,
            alerts,
            config,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweep the ledger as of `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport, RepIdError> {
        let ratings = self.ledger.ratings_since(now - self.config.lookback()).await?;
        let findings = sweep(&ratings, now, &self.config);

        let mut report = SweepReport {
            ratings_scanned: ratings.len(),
            ..SweepReport::default()
        };
        for alert in findings {
            if self.alerts.has_fingerprint(&alert.fingerprint).await? {
                report.duplicates_suppressed += 1;
                continue;
            }
            self.alerts.save_alert(&alert).await?;
            tracing::info!(
                alert = %alert.id,
                method = alert.method.as_str(),
                severity = %alert.severity,
                entities = alert.entities.len(),
                "Manipulation alert raised"
            );
            report.alerts_raised += 1;
            report.alert_ids.push(alert.id);
        }

        tracing::info!(
            scanned = report.ratings_scanned,
            raised = report.alerts_raised,
            suppressed = report.duplicates_suppressed,
            "Sweep finished"
        );
        Ok(report)
    }

    pub async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<ManipulationAlert>, RepIdError> {
        self.alerts.list_alerts(status).await
    }

    /// Advance an alert through the review workflow.
    pub async fn review_alert(
        &self,
        id: &Uuid,
        next: AlertStatus,
        reviewer: Option<String>,
        notes: Option<String>,
    ) -> Result<ManipulationAlert, RepIdError> {
        let mut alert = self
            .alerts
            .get_alert(id)
            .await?
            .ok_or_else(|| RepIdError::NotFound(format!("alert {}", id)))?;
        let from = alert.status;
        alert.transition(next, reviewer, notes, Utc::now())?;
        self.alerts.save_alert(&alert).await?;

        tracing::info!(alert = %id, from = %from, to = %next, "Alert status changed");
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use repid_core::traits::ReputationStore;
    use repid_core::{
        AggregatedScore, AnomalyCounters, CategoryCounts, DimensionScores, DimensionWeights,
        EntityRef, EntityType, ManipulationFlag, Rating, RatingSubmission, WeightBreakdown,
    };
    use repid_store::MemoryStore;

    fn rating(rater: i64, target: i64, score: f64, at: DateTime<Utc>) -> Rating {
        let sub = RatingSubmission::new(
            EntityRef::new(EntityType::User, rater),
            EntityRef::new(EntityType::User, target),
            DimensionScores::uniform(score),
        );
        let weight = WeightBreakdown {
            base_weight: 0.5,
            proof_bonus: 0.0,
            context_multiplier: 0.0,
            self_penalty: 1.0,
            final_weight: 0.5,
        };
        Rating::from_submission(sub, 500.0, weight, ManipulationFlag::clean(), at)
    }

    fn row_for(rating: &Rating, version: u64) -> AggregatedScore {
        AggregatedScore {
            entity: rating.target.key(),
            dimensions: rating.scores,
            composite: 50.0,
            previous_composite: None,
            raw_composite: 50.0,
            weights: DimensionWeights::default(),
            total_ratings: version,
            counts: CategoryCounts::default(),
            bayesian_weight: 0.0,
            manipulation_risk: 0.0,
            anomalies: AnomalyCounters::default(),
            version,
            updated_at: rating.created_at,
        }
    }

    /// Seed a reciprocal pair directly through the store.
    async fn seed_clique(store: &MemoryStore, now: DateTime<Utc>) {
        let at = now - Duration::days(1);
        let ab = rating(1, 2, 9.0, at);
        let ba = rating(2, 1, 9.0, at);
        store.commit_rating(&ab, &row_for(&ab, 1), None).await.unwrap();
        store.commit_rating(&ba, &row_for(&ba, 1), None).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_raises_then_suppresses_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_clique(&store, now).await;

        let job = ManipulationSweep::new(store.clone(), store.clone(), SweepConfig::default());
        let first = job.run(now).await.unwrap();
        assert_eq!(first.ratings_scanned, 2);
        assert_eq!(first.alerts_raised, 1);

        let second = job.run(now).await.unwrap();
        assert_eq!(second.alerts_raised, 0);
        assert_eq!(second.duplicates_suppressed, 1);
        assert_eq!(job.list_alerts(None).await.unwrap().len(), 1);
        // The sweep never writes ratings.
        assert_eq!(store.rating_count(), 2);
    }

    #[tokio::test]
    async fn review_walks_the_workflow() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        seed_clique(&store, now).await;
        let job = ManipulationSweep::new(store.clone(), store.clone(), SweepConfig::default());
        let id = job.run(now).await.unwrap().alert_ids[0];

        let skipped = job
            .review_alert(&id, AlertStatus::Confirmed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(skipped, RepIdError::InvalidState(_)));

        job.review_alert(&id, AlertStatus::UnderReview, Some("mod-1".into()), None)
            .await
            .unwrap();
        let confirmed = job
            .review_alert(&id, AlertStatus::Confirmed, Some("mod-1".into()), Some("ring".into()))
            .await
            .unwrap();
        assert_eq!(confirmed.status, AlertStatus::Confirmed);
        assert_eq!(confirmed.reviewer.as_deref(), Some("mod-1"));

        let open = job.list_alerts(Some(AlertStatus::Pending)).await.unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn reviewing_unknown_alert_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let job = ManipulationSweep::new(store.clone(), store, SweepConfig::default());
        let err = job
            .review_alert(&Uuid::now_v7(), AlertStatus::UnderReview, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepIdError::NotFound(_)));
    }
}
