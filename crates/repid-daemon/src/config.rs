// crates/repid-daemon/src/config.rs
//
// Runtime configuration for the RepID daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use repid_access::AccessConfig;
use repid_consensus::EngineConfig;
use repid_detect::{CliqueConfig, DetectorConfig, SpikeConfig, SweepConfig};

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the RocksDB ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between manipulation sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub detector: DetectorSection,

    #[serde(default)]
    pub access: AccessConfig,
}

/// `[detector]`: inline screening keys at the top level, batch sweep
/// thresholds under `[detector.spike]` and `[detector.clique]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorSection {
    #[serde(flatten)]
    pub inline: DetectorConfig,
    #[serde(default)]
    pub spike: SpikeConfig,
    #[serde(default)]
    pub clique: CliqueConfig,
}

impl DetectorSection {
    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            spike: self.spike.clone(),
            clique: self.clique.clone(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.repid/data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            engine: EngineConfig::default(),
            detector: DetectorSection::default(),
            access: AccessConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
