// crates/repid-daemon/tests/integration_pipeline.rs
//
// Integration tests for the RepID daemon.
//
// Tests the wired-up pipeline: submission -> aggregation -> credential
// refresh, persistence across a RocksDB reopen, and the manipulation sweep
// against a persisted ledger.
//
// These tests use the public APIs of the underlying library crates directly
// (repid-consensus, repid-store, repid-access, repid-core) since the daemon is
// a binary crate with no lib.rs.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use repid_access::{AccessConfig, AccessTier, CredentialRegistry};
use repid_consensus::{EngineConfig, ManipulationSweep, ReputationEngine, StoreReputationLookup};
use repid_core::traits::{AlertStore, RatingLedger, ScoreStore};
use repid_core::{
    AlertStatus, DetectionMethod, DimensionScores, EntityKey, EntityRef, EntityType,
    RatingSubmission,
};
use repid_detect::{DetectorConfig, SweepConfig};
use repid_store::{MemoryStore, RocksStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("repid_it_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

fn user(id: i64) -> EntityRef {
    EntityRef::new(EntityType::User, id)
}

fn model(id: i64) -> EntityRef {
    EntityRef::new(EntityType::AiModel, id)
}

fn engine_over<S>(store: Arc<S>, credentials: Arc<CredentialRegistry>) -> ReputationEngine
where
    S: repid_core::traits::ReputationStore + 'static,
{
    let lookup = Arc::new(StoreReputationLookup::new(store.clone()));
    ReputationEngine::new(store, lookup, EngineConfig::default(), DetectorConfig::default())
        .unwrap()
        .with_refresher(credentials)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_submission_refreshes_credentials() {
    let store = Arc::new(MemoryStore::new());
    let credentials = Arc::new(CredentialRegistry::new(AccessConfig::default()));
    let engine = engine_over(store.clone(), credentials.clone());

    let target = model(11).key();
    let neutral = engine.get_aggregated_score(&target).await.unwrap();
    assert!(!neutral.has_ratings);

    // Key issued while the model is still at neutral: standard tier.
    let key = credentials
        .issue(target, neutral.composite, Some("inference".into()), Utc::now())
        .unwrap();
    assert_eq!(key.limit.tier, AccessTier::Standard);

    // Low ratings drag the model below 50.
    for rater in 1..=6 {
        let receipt = engine
            .submit_rating(RatingSubmission::new(user(rater), model(11), DimensionScores::uniform(1.0)))
            .await
            .unwrap();
        assert_eq!(receipt.credentials_refreshed, Some(1));
    }

    let view = engine.get_aggregated_score(&target).await.unwrap();
    assert!(view.composite < 50.0);
    let refreshed = credentials.get(&key.id).unwrap().unwrap();
    assert_eq!(refreshed.limit.tier, AccessTier::Basic);
    assert_eq!(refreshed.limit.effective_limit, 100);
    assert!((refreshed.limit.score - view.composite).abs() < 1e-9);
}

#[tokio::test]
async fn test_rater_reputation_feeds_back_into_weight() {
    let store = Arc::new(MemoryStore::new());
    let credentials = Arc::new(CredentialRegistry::default());
    let engine = engine_over(store.clone(), credentials);

    // User 2 earns a score by being rated first.
    engine
        .submit_rating(RatingSubmission::new(user(1), user(2), DimensionScores::uniform(9.0)))
        .await
        .unwrap();
    let rep = engine.rater_reputation(&user(2).key()).await.unwrap();
    let stored = store.get_score(&user(2).key()).await.unwrap().unwrap();
    assert_eq!(rep, stored.composite);

    let receipt = engine
        .submit_rating(RatingSubmission::new(user(2), model(3), DimensionScores::uniform(6.0)))
        .await
        .unwrap();
    assert!((receipt.weight - rep / 1000.0).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// RocksDB persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rocks_pipeline_survives_reopen() {
    let path = temp_db_path("reopen");
    let target = model(5).key();
    let composite;
    let rating_id;

    {
        let store = Arc::new(RocksStore::open(&path).unwrap());
        let engine = engine_over(store.clone(), Arc::new(CredentialRegistry::default()));
        let receipt = engine
            .submit_rating(
                RatingSubmission::new(user(1), model(5), DimensionScores::uniform(8.0))
                    .with_proof("ipfs://proof", true)
                    .with_context("https://example.org/review"),
            )
            .await
            .unwrap();
        composite = receipt.composite;
        rating_id = receipt.rating_id;
    }

    let store = Arc::new(RocksStore::open(&path).unwrap());
    let rating = store.get_rating(&rating_id).await.unwrap().unwrap();
    assert!(rating.verify_digest());
    assert!(rating.proof_verified);
    // Neutral rater 50/1000 x (1 + 0.5 + 0.2).
    assert!((rating.weight.final_weight - 0.085).abs() < 1e-12);

    let engine = engine_over(store.clone(), Arc::new(CredentialRegistry::default()));
    let view = engine.get_aggregated_score(&target).await.unwrap();
    assert_eq!(view.composite, composite);

    // Nothing new in the ledger: recompute leaves the row alone.
    let again = engine.recompute(&target).await.unwrap();
    assert_eq!(again.composite, composite);
    assert_eq!(store.get_score(&target).await.unwrap().unwrap().version, 1);

    let _ = std::fs::remove_dir_all(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocks_concurrent_submissions() {
    let path = temp_db_path("concurrent");
    let store = Arc::new(RocksStore::open(&path).unwrap());
    let engine = Arc::new(engine_over(store.clone(), Arc::new(CredentialRegistry::default())));

    let mut handles = Vec::new();
    for rater in 1..=20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .submit_rating(RatingSubmission::new(user(rater), model(1), DimensionScores::uniform(7.0)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ledger = store.ratings_for_target(&model(1).key()).await.unwrap();
    assert_eq!(ledger.len(), 20);
    let row = store.get_score(&model(1).key()).await.unwrap().unwrap();
    assert_eq!(row.total_ratings, 20);
    assert_eq!(row.version, 20);

    let _ = std::fs::remove_dir_all(&path);
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sweep_flags_reciprocal_ring_and_review() {
    let path = temp_db_path("sweep");
    let store = Arc::new(RocksStore::open(&path).unwrap());
    let engine = engine_over(store.clone(), Arc::new(CredentialRegistry::default()));

    // Three users rating each other 9/10 in both directions.
    let ring = [1_i64, 2, 3];
    for &a in &ring {
        for &b in &ring {
            if a != b {
                engine
                    .submit_rating(RatingSubmission::new(user(a), user(b), DimensionScores::uniform(9.0)))
                    .await
                    .unwrap();
            }
        }
    }

    let sweep = ManipulationSweep::new(store.clone(), store.clone(), SweepConfig::default());
    let report = sweep.run(Utc::now()).await.unwrap();
    assert_eq!(report.ratings_scanned, 6);
    assert_eq!(report.alerts_raised, 1);

    let alert = store.get_alert(&report.alert_ids[0]).await.unwrap().unwrap();
    assert_eq!(alert.method, DetectionMethod::Clique);
    let members: Vec<EntityKey> = ring.iter().map(|&id| user(id).key()).collect();
    assert_eq!(alert.entities, members);

    // Same day, same finding: suppressed.
    assert_eq!(sweep.run(Utc::now()).await.unwrap().alerts_raised, 0);

    sweep
        .review_alert(&alert.id, AlertStatus::UnderReview, Some("ops".into()), None)
        .await
        .unwrap();
    sweep
        .review_alert(&alert.id, AlertStatus::FalsePositive, None, Some("team channel".into()))
        .await
        .unwrap();
    let resolved = sweep
        .review_alert(&alert.id, AlertStatus::Resolved, None, None)
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.reviewer.as_deref(), Some("ops"));
    assert_eq!(
        store.list_alerts(Some(AlertStatus::Resolved)).await.unwrap().len(),
        1
    );

    // Ledger untouched by sweep or review.
    assert_eq!(store.ratings_since(Utc::now() - chrono::Duration::hours(1)).await.unwrap().len(), 6);

    let _ = std::fs::remove_dir_all(&path);
}
