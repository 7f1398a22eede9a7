// crates/repid-detect/src/sweep.rs
//
// Batch manipulation sweep over the recent rating ledger.
//
// Two detectors run per sweep:
//   - Rating spikes: a target receiving far more ratings in the latest window
//     than in its own recent baseline windows.
//   - Cliques: entities rating each other highly and reciprocally, forming a
//     dense mutual subgraph.
//
// Every finding carries a fingerprint so repeated sweeps over the same day do
// not append duplicate alerts.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use repid_core::{
    AlertEvidence, AlertSeverity, AlertStatus, DetectionMethod, EntityKey, ManipulationAlert,
    Rating,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::graph::RatingGraph;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeConfig {
    /// Size of the window under test and of each baseline bucket.
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Number of windows before the current one used as baseline.
    #[serde(default = "default_baseline_buckets")]
    pub baseline_buckets: usize,
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Minimum ratings in the current window before a spike is considered.
    #[serde(default = "default_min_window_count")]
    pub min_window_count: u64,
    /// Floor for the baseline standard deviation (a flat baseline would
    /// otherwise give an infinite z-score).
    #[serde(default = "default_min_stddev")]
    pub min_stddev: f64,
}

fn default_window_hours() -> i64 {
    24
}
fn default_baseline_buckets() -> usize {
    7
}
fn default_z_threshold() -> f64 {
    3.0
}
fn default_min_window_count() -> u64 {
    5
}
fn default_min_stddev() -> f64 {
    1.0
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            baseline_buckets: default_baseline_buckets(),
            z_threshold: default_z_threshold(),
            min_window_count: default_min_window_count(),
            min_stddev: default_min_stddev(),
        }
    }
}

impl SpikeConfig {
    pub fn lookback(&self) -> Duration {
        Duration::hours(self.window_hours.max(1) * (self.baseline_buckets as i64 + 1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliqueConfig {
    #[serde(default = "default_clique_window_days")]
    pub window_days: i64,
    /// Minimum mean dimension score for an edge to count as "high".
    #[serde(default = "default_high_score")]
    pub high_score: f64,
    #[serde(default = "default_min_density")]
    pub min_density: f64,
    #[serde(default = "default_min_members")]
    pub min_members: usize,
}

fn default_clique_window_days() -> i64 {
    30
}
fn default_high_score() -> f64 {
    8.0
}
fn default_min_density() -> f64 {
    0.8
}
fn default_min_members() -> usize {
    2
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self {
            window_days: default_clique_window_days(),
            high_score: default_high_score(),
            min_density: default_min_density(),
            min_members: default_min_members(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub spike: SpikeConfig,
    #[serde(default)]
    pub clique: CliqueConfig,
}

impl SweepConfig {
    /// How far back the ledger must be read to feed both detectors.
    pub fn lookback(&self) -> Duration {
        self.spike
            .lookback()
            .max(Duration::days(self.clique.window_days.max(1)))
    }
}

/// Hex SHA-256 over method, sorted entities and the UTC day of `now`.
pub fn fingerprint(method: DetectionMethod, entities: &[EntityKey], now: DateTime<Utc>) -> String {
    let mut sorted = entities.to_vec();
    sorted.sort();
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    for entity in &sorted {
        hasher.update(b"|");
        hasher.update(entity.to_string().as_bytes());
    }
    hasher.update(b"|");
    hasher.update(now.date_naive().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn spike_severity(z: f64) -> AlertSeverity {
    if z >= 10.0 {
        AlertSeverity::Critical
    } else if z >= 6.0 {
        AlertSeverity::High
    } else if z >= 4.0 {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

fn clique_severity(members: usize) -> AlertSeverity {
    match members {
        n if n >= 8 => AlertSeverity::Critical,
        n if n >= 5 => AlertSeverity::High,
        n if n >= 3 => AlertSeverity::Medium,
        _ => AlertSeverity::Low,
    }
}

fn new_alert(
    method: DetectionMethod,
    severity: AlertSeverity,
    mut entities: Vec<EntityKey>,
    evidence: AlertEvidence,
    now: DateTime<Utc>,
) -> ManipulationAlert {
    entities.sort();
    ManipulationAlert {
        id: Uuid::now_v7(),
        fingerprint: fingerprint(method, &entities, now),
        method,
        severity,
        entities,
        evidence,
        status: AlertStatus::Pending,
        reviewer: None,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Flag targets whose rating count in the latest window is an outlier
/// against their own baseline windows.
pub fn detect_rating_spikes(
    ratings: &[Rating],
    now: DateTime<Utc>,
    config: &SpikeConfig,
) -> Vec<ManipulationAlert> {
    let window = Duration::hours(config.window_hours.max(1));
    let buckets = config.baseline_buckets;
    // Bucket 0 is the current window, 1..=buckets the baseline.
    let mut counts: HashMap<EntityKey, Vec<u64>> = HashMap::new();

    for rating in ratings {
        if rating.created_at > now {
            continue;
        }
        let age = now - rating.created_at;
        let bucket = (age.num_milliseconds() / window.num_milliseconds()) as usize;
        if bucket > buckets {
            continue;
        }
        counts
            .entry(rating.target.key())
            .or_insert_with(|| vec![0; buckets + 1])[bucket] += 1;
    }

    let mut targets: Vec<EntityKey> = counts.keys().copied().collect();
    targets.sort();

    let mut alerts = Vec::new();
    for target in targets {
        let Some(series) = counts.get(&target) else {
            continue;
        };
        let current = series[0];
        if current < config.min_window_count {
            continue;
        }

        let baseline = &series[1..];
        let (mean, stddev) = if baseline.is_empty() {
            (0.0, 0.0)
        } else {
            let n = baseline.len() as f64;
            let mean = baseline.iter().sum::<u64>() as f64 / n;
            let var = baseline
                .iter()
                .map(|&c| (c as f64 - mean).powi(2))
                .sum::<f64>()
                / n;
            (mean, var.sqrt())
        };
        let z = (current as f64 - mean) / stddev.max(config.min_stddev);
        if z < config.z_threshold {
            continue;
        }

        tracing::debug!(
            target = %target,
            window_count = current,
            baseline_mean = mean,
            z_score = z,
            "Rating spike detected"
        );
        alerts.push(new_alert(
            DetectionMethod::RatingSpike,
            spike_severity(z),
            vec![target],
            AlertEvidence::RatingSpike {
                window_count: current,
                baseline_mean: mean,
                baseline_stddev: stddev,
                z_score: z,
            },
            now,
        ));
    }
    alerts
}

/// Flag dense groups of entities rating each other highly in both directions.
pub fn detect_cliques(
    ratings: &[Rating],
    now: DateTime<Utc>,
    config: &CliqueConfig,
) -> Vec<ManipulationAlert> {
    let since = now - Duration::days(config.window_days.max(1));
    let graph = RatingGraph::from_ratings(
        ratings
            .iter()
            .filter(|r| r.created_at >= since && r.created_at <= now),
    );

    graph
        .mutual_components(config.high_score)
        .into_iter()
        .filter(|c| c.members.len() >= config.min_members.max(2))
        .filter(|c| c.density() >= config.min_density)
        .map(|c| {
            tracing::debug!(
                members = c.members.len(),
                mutual_edges = c.mutual_edges,
                density = c.density(),
                "Reciprocal rating clique detected"
            );
            let evidence = AlertEvidence::Clique {
                members: c.members.len(),
                mutual_edges: c.mutual_edges,
                density: c.density(),
                mean_score: c.mean_score,
            };
            new_alert(
                DetectionMethod::Clique,
                clique_severity(c.members.len()),
                c.members,
                evidence,
                now,
            )
        })
        .collect()
}

/// Run every batch detector over `ratings`.
pub fn sweep(ratings: &[Rating], now: DateTime<Utc>, config: &SweepConfig) -> Vec<ManipulationAlert> {
    let mut alerts = detect_rating_spikes(ratings, now, &config.spike);
    let spikes = alerts.len();
    alerts.extend(detect_cliques(ratings, now, &config.clique));

    tracing::info!(
        ratings = ratings.len(),
        spikes,
        cliques = alerts.len() - spikes,
        "Manipulation sweep complete"
    );
    alerts
}
