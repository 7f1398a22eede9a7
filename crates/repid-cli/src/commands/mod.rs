// crates/repid-cli/src/commands/mod.rs
//
// Command module declarations for the RepID CLI, plus the shared context
// every store-backed command runs against.

pub mod alerts;
pub mod score;
pub mod submit;
pub mod sweep;
pub mod tier;

use std::sync::Arc;

use repid_access::AccessConfig;
use repid_consensus::{
    EngineConfig, ManipulationSweep, ReputationEngine, StoreReputationLookup,
};
use repid_detect::{DetectorConfig, SweepConfig};
use repid_store::RocksStore;

/// Services wired over the local store, default tunables.
pub struct Context {
    pub engine: ReputationEngine,
    pub sweep: ManipulationSweep,
    pub access: AccessConfig,
}

impl Context {
    pub fn open(data_dir: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let data_dir = expand_tilde(data_dir);
        std::fs::create_dir_all(&data_dir)?;
        let path = format!("{}/rocksdb", data_dir);
        let store = Arc::new(RocksStore::open(&path)?);

        let lookup = Arc::new(StoreReputationLookup::new(store.clone()));
        let engine = ReputationEngine::new(
            store.clone(),
            lookup,
            EngineConfig::default(),
            DetectorConfig::default(),
        )?;
        let sweep = ManipulationSweep::new(store.clone(), store, SweepConfig::default());

        Ok(Self {
            engine,
            sweep,
            access: AccessConfig::default(),
        })
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
