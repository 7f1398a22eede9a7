// crates/repid-cli/src/commands/sweep.rs
//
// `repid sweep`: one manipulation sweep over the local ledger.

use chrono::Utc;

use super::Context;
use crate::output::{format_json, OutputFormat};

/// Run the sweep subcommand.
pub async fn run(ctx: &Context, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let report = ctx.sweep.run(Utc::now()).await?;

    match format {
        OutputFormat::Json => println!("{}", format_json(&report)),
        OutputFormat::Table => {
            println!("Sweep complete");
            println!("  Ratings scanned:       {}", report.ratings_scanned);
            println!("  Alerts raised:         {}", report.alerts_raised);
            println!("  Duplicates suppressed: {}", report.duplicates_suppressed);
            for id in &report.alert_ids {
                println!("  - {}", id);
            }
        }
    }
    Ok(())
}
