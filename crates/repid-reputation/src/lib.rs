// crates/repid-reputation/src/lib.rs
//
// repid-reputation: Rating weights, time decay, Bayesian smoothing, EMA, and
// ledger aggregation for the RepID consensus engine.
//
// Everything here is pure and deterministic given its inputs (including the
// `now` timestamp); persistence and serialization live in repid-consensus.

pub mod aggregate;
pub mod decay;
pub mod smoothing;
pub mod weight;

pub use aggregate::{aggregate_ratings, next_score, Aggregate, AggregationConfig};
pub use decay::TimeDecay;
pub use weight::{compute_weight, WeightConfig};
