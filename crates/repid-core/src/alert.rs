// crates/repid-core/src/alert.rs
//
// Manipulation alerts raised by the periodic ledger sweep.
//
// Review workflow:
//   Pending -> UnderReview -> Confirmed     -> Resolved
//                          -> FalsePositive -> Resolved
//
// Alerts are appended and reviewed; the ratings they point at are never
// modified or erased.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityKey;
use crate::error::RepIdError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    UnderReview,
    Confirmed,
    FalsePositive,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::UnderReview => "under_review",
            AlertStatus::Confirmed => "confirmed",
            AlertStatus::FalsePositive => "false_positive",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Whether the workflow allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Pending, AlertStatus::UnderReview)
                | (AlertStatus::UnderReview, AlertStatus::Confirmed)
                | (AlertStatus::UnderReview, AlertStatus::FalsePositive)
                | (AlertStatus::Confirmed, AlertStatus::Resolved)
                | (AlertStatus::FalsePositive, AlertStatus::Resolved)
        )
    }

    /// Open alerts still need a human decision.
    pub fn is_open(&self) -> bool {
        matches!(self, AlertStatus::Pending | AlertStatus::UnderReview)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = RepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AlertStatus::Pending),
            "under_review" => Ok(AlertStatus::UnderReview),
            "confirmed" => Ok(AlertStatus::Confirmed),
            "false_positive" => Ok(AlertStatus::FalsePositive),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(RepIdError::validation(
                "status",
                format!("unknown alert status '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Burst of ratings for one target far above its own baseline.
    RatingSpike,
    /// Group of entities rating each other highly and reciprocally.
    Clique,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::RatingSpike => "rating_spike",
            DetectionMethod::Clique => "clique",
        }
    }
}

/// Statistical evidence backing an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertEvidence {
    RatingSpike {
        window_count: u64,
        baseline_mean: f64,
        baseline_stddev: f64,
        z_score: f64,
    },
    Clique {
        members: usize,
        mutual_edges: usize,
        density: f64,
        mean_score: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManipulationAlert {
    pub id: Uuid,
    /// Hex SHA-256 of method + sorted entities + day bucket. Used to avoid
    /// re-raising the same finding on every sweep.
    pub fingerprint: String,
    pub method: DetectionMethod,
    pub severity: AlertSeverity,
    /// Entities involved, sorted.
    pub entities: Vec<EntityKey>,
    pub evidence: AlertEvidence,
    pub status: AlertStatus,
    pub reviewer: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ManipulationAlert {
    /// Move the alert along the review workflow.
    ///
    /// Returns `RepIdError::InvalidState` for any transition the workflow does not allow.
    pub fn transition(
        &mut self,
        next: AlertStatus,
        reviewer: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), RepIdError> {
        if !self.status.can_transition_to(next) {
            return Err(RepIdError::InvalidState(format!(
                "alert {}: cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        if reviewer.is_some() {
            self.reviewer = reviewer;
        }
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }
}
