// crates/repid-store/src/lib.rs
//
// repid-store: Storage layer for the RepID consensus engine.
//
// Provides a RocksDB-backed ledger/score/alert store for durable deployments
// and an in-memory store with identical semantics for tests and embedding.
// Both implement the `ReputationStore` and `AlertStore` traits from repid-core,
// including the atomic rating+score commit and optimistic version check.

pub mod memory;
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use repid_core::error::RepIdError;
use repid_core::Rating;

/// Order ratings newest first, breaking timestamp ties by id (UUID v7 is time-ordered).
pub(crate) fn sort_newest_first(ratings: &mut [Rating]) {
    ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

/// Shared optimistic version check for score upserts.
pub(crate) fn check_version(
    entity: &repid_core::EntityKey,
    current: Option<u64>,
    expected: Option<u64>,
) -> Result<(), RepIdError> {
    if current != expected {
        return Err(RepIdError::Concurrency(format!(
            "score row for {} changed underneath writer (expected version {:?}, found {:?})",
            entity, expected, current
        )));
    }
    Ok(())
}
