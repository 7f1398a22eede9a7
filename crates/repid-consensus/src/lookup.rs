// crates/repid-consensus/src/lookup.rs
//
// Rater reputation lookup: Score Store first, then an optional external
// identity service. Unknown raters resolve to the neutral baseline upstream.

use std::sync::Arc;

use async_trait::async_trait;

use repid_core::traits::{ReputationLookup, ScoreStore};
use repid_core::{EntityKey, RepIdError};

pub struct StoreReputationLookup {
    scores: Arc<dyn ScoreStore>,
    external: Option<Arc<dyn ReputationLookup>>,
}

impl StoreReputationLookup {
    pub fn new(scores: Arc<dyn ScoreStore>) -> Self {
        Self {
            scores,
            external: None,
        }
    }

    /// Consult `external` for raters without a Score Store row.
    pub fn with_external(mut self, external: Arc<dyn ReputationLookup>) -> Self {
        self.external = Some(external);
        self
    }
}

#[async_trait]
impl ReputationLookup for StoreReputationLookup {
    async fn reputation_of(&self, entity: &EntityKey) -> Result<Option<f64>, RepIdError> {
        if let Some(score) = self.scores.get_score(entity).await? {
            return Ok(Some(score.composite));
        }

        let Some(external) = &self.external else {
            return Ok(None);
        };
        // An unreachable identity service degrades to neutral rather than
        // failing the submission.
        match external.reputation_of(entity).await {
            Ok(found) => Ok(found),
            Err(e) => {
                tracing::warn!(entity = %entity, error = %e, "External reputation lookup failed");
                Ok(None)
            }
        }
    }
}
