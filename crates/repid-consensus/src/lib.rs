// crates/repid-consensus/src/lib.rs
//
// repid-consensus: The RepID consensus engine.
//
// Ties the pure pieces together: validate -> look up rater reputation ->
// weight -> inline screen -> append + aggregate under a per-entity lock ->
// refresh derived credentials. Also hosts the periodic manipulation sweep job.

pub mod config;
pub mod engine;
pub mod locks;
pub mod lookup;
pub mod sweep_job;

pub use config::EngineConfig;
pub use engine::{ReputationEngine, SubmitReceipt};
pub use locks::EntityLocks;
pub use lookup::StoreReputationLookup;
pub use sweep_job::{ManipulationSweep, SweepReport};
