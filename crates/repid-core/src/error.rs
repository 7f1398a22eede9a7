use thiserror::Error;

/// Error taxonomy for the RepID consensus engine.
#[derive(Debug, Error)]
pub enum RepIdError {
    /// A submission field is out of range or missing. Rejected before any persistence.
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Resource not found (alerts, credentials, ratings by id).
    ///
    /// Unknown entities are never an error: score lookups resolve to the neutral baseline.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Per-entity aggregation could not be serialized (lock timeout or version conflict).
    /// Retryable.
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// The submission transaction exceeded its time budget. Retryable.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A collaborator failed after the rating itself was valid (credential refresh, external lookup).
    #[error("Downstream error: {0}")]
    Downstream(String),

    /// Storage layer error (RocksDB, in-memory store).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state transition (alert review workflow, configuration invariants).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl RepIdError {
    /// Build a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RepIdError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepIdError::Concurrency(_) | RepIdError::Timeout(_))
    }
}

impl From<serde_json::Error> for RepIdError {
    fn from(e: serde_json::Error) -> Self {
        RepIdError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_and_timeout_are_retryable() {
        assert!(RepIdError::Concurrency("lock".into()).is_retryable());
        assert!(RepIdError::Timeout("slow".into()).is_retryable());
        assert!(!RepIdError::validation("factual", "out of range").is_retryable());
        assert!(!RepIdError::Storage("disk".into()).is_retryable());
    }

    #[test]
    fn validation_message_names_field() {
        let err = RepIdError::validation("confidence", "must be within [0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "Validation error on `confidence`: must be within [0, 1], got 1.5"
        );
    }
}
