// crates/repid-daemon/src/shared.rs
//
// Services: the daemon's service container.
//
// Constructed once in main.rs from the loaded config and the opened store.
// The daemon itself only drives `sweep` on a schedule. `engine` and
// `credentials` are the embedding surface for a request-handler layer
// (submissions, key issuance) mounted on top of this process; the engine
// already refreshes the registry on every score change.

use std::sync::Arc;
use std::time::Instant;

use repid_access::CredentialRegistry;
use repid_consensus::{ManipulationSweep, ReputationEngine, StoreReputationLookup};
use repid_core::RepIdError;
use repid_store::RocksStore;

use crate::config::DaemonConfig;

#[derive(Clone)]
pub struct Services {
    pub engine: Arc<ReputationEngine>,
    pub credentials: Arc<CredentialRegistry>,
    pub sweep: Arc<ManipulationSweep>,
    /// Daemon start time for uptime reporting.
    pub start_time: Instant,
}

impl Services {
    pub fn build(store: Arc<RocksStore>, config: &DaemonConfig) -> Result<Self, RepIdError> {
        let credentials = Arc::new(CredentialRegistry::new(config.access.clone()));
        let lookup = Arc::new(StoreReputationLookup::new(store.clone()));
        let engine = ReputationEngine::new(
            store.clone(),
            lookup,
            config.engine.clone(),
            config.detector.inline.clone(),
        )?
        .with_refresher(credentials.clone());
        let sweep = ManipulationSweep::new(store.clone(), store, config.detector.sweep());

        Ok(Self {
            engine: Arc::new(engine),
            credentials,
            sweep: Arc::new(sweep),
            start_time: Instant::now(),
        })
    }
}
