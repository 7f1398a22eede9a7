// crates/repid-store/src/rocks.rs
//
// RocksDB-backed persistent storage for the ledger, aggregated scores, and alerts.
//
// Key format:
//   - Primary:   `rating:{uuid}`                      -> JSON-serialized Rating
//   - Secondary: `target:{type}:{id}:{millis}:{uuid}` -> empty value (index only)
//   - Secondary: `rater:{type}:{id}:{millis}:{uuid}`  -> empty value (index only)
//   - Secondary: `time:{millis}:{uuid}`               -> empty value (index only)
//   - Score:     `score:{type}:{id}`                  -> JSON-serialized AggregatedScore
//   - Alert:     `alert:{uuid}`                       -> JSON-serialized ManipulationAlert
//   - Alert fp:  `alertfp:{fingerprint}`              -> alert uuid
//
// Timestamps in index keys are zero-padded milliseconds so lexicographic order
// matches chronological order, and time-bounded reads seek straight to
// `{prefix}{since_millis}`. A rating and its score row are written in a
// single WriteBatch.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use uuid::Uuid;

use repid_core::error::RepIdError;
use repid_core::traits::{AlertStore, RatingLedger, ReputationStore, ScoreStore};
use repid_core::{AggregatedScore, AlertStatus, EntityKey, ManipulationAlert, Rating};

use crate::{check_version, sort_newest_first};

/// RocksDB wrapper implementing `ReputationStore` and `AlertStore`.
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
    /// Serializes version-checked writes within this process.
    write_guard: Mutex<()>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore").finish_non_exhaustive()
    }
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, RepIdError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            RepIdError::Storage(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        tracing::debug!("RocksStore opened at {}", path);
        Ok(Self {
            db,
            write_guard: Mutex::new(()),
        })
    }

    fn rating_key(id: &Uuid) -> Vec<u8> {
        format!("rating:{}", id).into_bytes()
    }

    fn target_prefix(entity: &EntityKey) -> String {
        format!("target:{}:", entity)
    }

    fn rater_prefix(entity: &EntityKey) -> String {
        format!("rater:{}:", entity)
    }

    fn indexed_suffix(rating: &Rating) -> String {
        format!("{}:{}", Self::millis_segment(rating.created_at), rating.id)
    }

    fn millis_segment(at: DateTime<Utc>) -> String {
        format!("{:020}", at.timestamp_millis().max(0))
    }

    fn score_key(entity: &EntityKey) -> Vec<u8> {
        format!("score:{}", entity).into_bytes()
    }

    fn alert_key(id: &Uuid) -> Vec<u8> {
        format!("alert:{}", id).into_bytes()
    }

    fn fingerprint_key(fingerprint: &str) -> Vec<u8> {
        format!("alertfp:{}", fingerprint).into_bytes()
    }

    /// Get raw bytes from RocksDB, mapping errors to RepIdError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, RepIdError> {
        self.db
            .get(key)
            .map_err(|e| RepIdError::Storage(format!("RocksDB get failed: {}", e)))
    }

    /// Put raw bytes into RocksDB, mapping errors to RepIdError::Storage.
    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), RepIdError> {
        self.db
            .put(key, value)
            .map_err(|e| RepIdError::Storage(format!("RocksDB put failed: {}", e)))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), RepIdError> {
        self.db
            .write(batch)
            .map_err(|e| RepIdError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, RepIdError> {
        self.write_guard
            .lock()
            .map_err(|e| RepIdError::Storage(format!("write guard poisoned: {}", e)))
    }

    /// Collect the trailing UUIDs of every key under `prefix`.
    fn scan_index(&self, prefix: &str) -> Result<Vec<Uuid>, RepIdError> {
        self.scan_index_from(prefix, prefix)
    }

    /// Like `scan_index`, but skips entries indexed before `since`.
    fn scan_index_since(&self, prefix: &str, since: DateTime<Utc>) -> Result<Vec<Uuid>, RepIdError> {
        let start = format!("{}{}", prefix, Self::millis_segment(since));
        self.scan_index_from(prefix, &start)
    }

    /// Walk keys forward from `start` while they stay under `prefix`.
    fn scan_index_from(&self, prefix: &str, start: &str) -> Result<Vec<Uuid>, RepIdError> {
        let prefix = prefix.as_bytes();
        let mut ids = Vec::new();

        let mode = IteratorMode::From(start.as_bytes(), Direction::Forward);
        for item in self.db.iterator(mode) {
            let (key, _value) = item
                .map_err(|e| RepIdError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // Stop when the prefix no longer matches.
            if !key.starts_with(prefix) {
                break;
            }

            // The UUID is the last `:`-separated segment.
            let key_str = std::str::from_utf8(&key).unwrap_or("");
            if let Some(id) = key_str.rsplit(':').next().and_then(|s| Uuid::parse_str(s).ok()) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    fn load_ratings(&self, ids: Vec<Uuid>, since: Option<DateTime<Utc>>) -> Result<Vec<Rating>, RepIdError> {
        let mut ratings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(rating) = self.get_rating_sync(&id)? {
                if since.map_or(true, |s| rating.created_at >= s) {
                    ratings.push(rating);
                }
            }
        }
        sort_newest_first(&mut ratings);
        Ok(ratings)
    }

    /// Synchronous accessor for a single rating.
    pub fn get_rating_sync(&self, id: &Uuid) -> Result<Option<Rating>, RepIdError> {
        match self.get_raw(&Self::rating_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Synchronous accessor for a score row.
    pub fn get_score_sync(&self, entity: &EntityKey) -> Result<Option<AggregatedScore>, RepIdError> {
        match self.get_raw(&Self::score_key(entity))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn current_version(&self, entity: &EntityKey) -> Result<Option<u64>, RepIdError> {
        Ok(self.get_score_sync(entity)?.map(|s| s.version))
    }
}

#[async_trait]
impl RatingLedger for RocksStore {
    async fn get_rating(&self, id: &Uuid) -> Result<Option<Rating>, RepIdError> {
        self.get_rating_sync(id)
    }

    async fn ratings_for_target(&self, target: &EntityKey) -> Result<Vec<Rating>, RepIdError> {
        let ids = self.scan_index(&Self::target_prefix(target))?;
        self.load_ratings(ids, None)
    }

    async fn ratings_by_rater_since(
        &self,
        rater: &EntityKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<Rating>, RepIdError> {
        let ids = self.scan_index_since(&Self::rater_prefix(rater), since)?;
        self.load_ratings(ids, Some(since))
    }

    async fn ratings_since(&self, since: DateTime<Utc>) -> Result<Vec<Rating>, RepIdError> {
        let ids = self.scan_index_since("time:", since)?;
        self.load_ratings(ids, Some(since))
    }
}

#[async_trait]
impl ScoreStore for RocksStore {
    async fn get_score(&self, entity: &EntityKey) -> Result<Option<AggregatedScore>, RepIdError> {
        self.get_score_sync(entity)
    }

    async fn put_score(
        &self,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError> {
        let _guard = self.lock_writes()?;
        check_version(&score.entity, self.current_version(&score.entity)?, expected_version)?;
        let json = serde_json::to_vec(score)?;
        self.put_raw(&Self::score_key(&score.entity), &json)
    }
}

#[async_trait]
impl ReputationStore for RocksStore {
    async fn commit_rating(
        &self,
        rating: &Rating,
        score: &AggregatedScore,
        expected_version: Option<u64>,
    ) -> Result<(), RepIdError> {
        let _guard = self.lock_writes()?;

        if self.get_raw(&Self::rating_key(&rating.id))?.is_some() {
            return Err(RepIdError::InvalidState(format!(
                "rating {} already in ledger",
                rating.id
            )));
        }
        check_version(&score.entity, self.current_version(&score.entity)?, expected_version)?;

        let rating_json = serde_json::to_vec(rating)?;
        let score_json = serde_json::to_vec(score)?;
        let suffix = Self::indexed_suffix(rating);

        let mut batch = WriteBatch::default();
        batch.put(Self::rating_key(&rating.id), rating_json);
        // Secondary index entries: empty value, existence is the signal.
        batch.put(
            format!("{}{}", Self::target_prefix(&rating.target.key()), suffix).as_bytes(),
            b"",
        );
        batch.put(
            format!("{}{}", Self::rater_prefix(&rating.rater.key()), suffix).as_bytes(),
            b"",
        );
        batch.put(format!("time:{}", suffix).as_bytes(), b"");
        batch.put(Self::score_key(&score.entity), score_json);

        self.write_batch(batch)
    }
}

#[async_trait]
impl AlertStore for RocksStore {
    async fn save_alert(&self, alert: &ManipulationAlert) -> Result<(), RepIdError> {
        let json = serde_json::to_vec(alert)?;
        let mut batch = WriteBatch::default();
        batch.put(Self::alert_key(&alert.id), json);
        batch.put(
            Self::fingerprint_key(&alert.fingerprint),
            alert.id.to_string().as_bytes(),
        );
        self.write_batch(batch)
    }

    async fn get_alert(&self, id: &Uuid) -> Result<Option<ManipulationAlert>, RepIdError> {
        match self.get_raw(&Self::alert_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<ManipulationAlert>, RepIdError> {
        let prefix = b"alert:";
        let mut alerts = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| RepIdError::Storage(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            let alert: ManipulationAlert = serde_json::from_slice(&value)?;
            if status.map_or(true, |s| alert.status == s) {
                alerts.push(alert);
            }
        }

        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn has_fingerprint(&self, fingerprint: &str) -> Result<bool, RepIdError> {
        Ok(self.get_raw(&Self::fingerprint_key(fingerprint))?.is_some())
    }
}
