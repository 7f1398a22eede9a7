// crates/repid-daemon/src/main.rs
//
// Binary entrypoint for the RepID daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, opens the
// RocksDB store, wires services once, and runs the sweep scheduler until
// shutdown.

mod config;
mod scheduler;
mod shared;

use std::sync::Arc;

use clap::Parser;
use config::DaemonConfig;
use scheduler::SweepScheduler;
use shared::Services;

use repid_store::RocksStore;

/// RepID daemon: reputation consensus engine with periodic manipulation sweeps.
#[derive(Parser, Debug)]
#[command(name = "repid-daemon", version = "0.1.0", about = "RepID consensus engine daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.repid/config.toml")]
    config: String,

    /// Overrides `data_dir` from the config file.
    #[arg(long)]
    data_dir: Option<String>,

    /// Overrides `log_level` from the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Overrides `sweep_interval_secs` from the config file.
    #[arg(long)]
    sweep_interval: Option<u64>,

    /// Run a single sweep and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found. Reported after tracing is up.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    // CLI flags override the config file values.
    if let Some(dir) = args.data_dir {
        daemon_config.data_dir = dir;
    }
    if let Some(level) = args.log_level {
        daemon_config.log_level = level;
    }
    if let Some(secs) = args.sweep_interval {
        daemon_config.sweep_interval_secs = secs;
    }

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    tracing::info!("RepID Daemon v0.1.0");
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!("Sweep interval: {}s", daemon_config.sweep_interval_secs);

    let data_dir = expand_tilde(&daemon_config.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let rocksdb_path = format!("{}/rocksdb", data_dir);
    let store = Arc::new(
        RocksStore::open(&rocksdb_path).map_err(|e| format!("Failed to open RocksDB: {}", e))?,
    );
    tracing::info!("RocksDB opened at {}", rocksdb_path);

    let services = Services::build(store, &daemon_config)?;
    tracing::info!(
        "Engine ready (alpha={}, tau={}d, max_retries={})",
        services.engine.config().aggregation.ema_alpha,
        services.engine.config().aggregation.decay.time_constant_days,
        services.engine.config().max_retries
    );
    tracing::info!(
        "Credential registry ready (hard_ceiling={}/window, window={}s)",
        services.credentials.config().hard_ceiling,
        services.credentials.config().window_secs
    );

    let mut scheduler = SweepScheduler::new(services.sweep.clone(), daemon_config.sweep_interval_secs);
    if args.once {
        scheduler.tick().await;
    } else {
        scheduler.run().await?;
    }

    tracing::info!(
        "RepID daemon shut down gracefully after {}s",
        services.start_time.elapsed().as_secs()
    );
    Ok(())
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
