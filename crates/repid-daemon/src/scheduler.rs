// crates/repid-daemon/src/scheduler.rs
//
// Sweep scheduler for the RepID daemon.
//
// Runs the manipulation sweep on a fixed interval until Ctrl-C. A failed
// sweep is logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use repid_consensus::ManipulationSweep;

pub struct SweepScheduler {
    sweep: Arc<ManipulationSweep>,
    interval: Duration,
    runs: u64,
}

impl SweepScheduler {
    pub fn new(sweep: Arc<ManipulationSweep>, interval_secs: u64) -> Self {
        Self {
            sweep,
            interval: Duration::from_secs(interval_secs.max(1)),
            runs: 0,
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Sweep scheduler started (interval={}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Sweep scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.tick().await;
                }
            }
        }

        Ok(())
    }

    /// Run one sweep now.
    pub async fn tick(&mut self) {
        self.runs += 1;
        match self.sweep.run(Utc::now()).await {
            Ok(report) => tracing::debug!(
                "Sweep #{}: {} ratings scanned, {} alerts raised",
                self.runs,
                report.ratings_scanned,
                report.alerts_raised
            ),
            Err(e) => tracing::error!("Sweep #{} failed: {}", self.runs, e),
        }
    }
}
