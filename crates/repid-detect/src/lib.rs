// crates/repid-detect/src/lib.rs
//
// repid-detect: Manipulation detection for the RepID consensus engine.
//
// Two paths share this crate:
//   - `inline`: per-submission screening run during ingestion. Advisory only,
//     the rating is recorded either way.
//   - `sweep`: periodic batch analysis over the recent ledger (rating spikes,
//     reciprocal rating cliques) that appends alerts for human review.

pub mod graph;
pub mod inline;
pub mod sweep;

pub use inline::{DetectorConfig, ManipulationDetector};
pub use sweep::{CliqueConfig, SpikeConfig, SweepConfig};
