// crates/repid-cli/src/main.rs
//
// CLI entrypoint for the RepID operator tools.
//
// Works directly against a local RocksDB data dir, so it must not run while
// a daemon holds the same directory open.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::alerts::AlertsCmd;
use commands::submit::SubmitArgs;
use commands::tier::TierArgs;
use commands::Context;
use output::OutputFormat;

/// RepID CLI: submit ratings, inspect scores and tiers, review manipulation alerts.
#[derive(Parser, Debug)]
#[command(
    name = "repid",
    version = "0.1.0",
    about = "RepID CLI for the weighted reputation consensus engine"
)]
struct Cli {
    /// Data directory holding the RocksDB ledger.
    #[arg(long, global = true, default_value = "~/.repid/data")]
    data_dir: String,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a rating and print the target's new composite.
    Submit(SubmitArgs),

    /// Show an entity's aggregated score (neutral baseline if unrated).
    Score {
        /// Entity as type:id, e.g. agent:7.
        entity: String,
        /// Recompute from the ledger before printing.
        #[arg(long)]
        recompute: bool,
    },

    /// Show the access tier and rate limit for an entity or a raw score.
    Tier(TierArgs),

    /// Run one manipulation sweep over the ledger.
    Sweep,

    /// Manipulation alert listing and review.
    #[command(subcommand)]
    Alerts(AlertsCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    // `tier --score` needs no store.
    if let Commands::Tier(args) = &cli.command {
        if args.entity.is_none() {
            return commands::tier::run(args, None, &format).await;
        }
    }

    let ctx = Context::open(&cli.data_dir)?;
    match &cli.command {
        Commands::Submit(args) => commands::submit::run(args, &ctx, &format).await?,
        Commands::Score { entity, recompute } => {
            commands::score::run(entity, *recompute, &ctx, &format).await?
        }
        Commands::Tier(args) => commands::tier::run(args, Some(&ctx), &format).await?,
        Commands::Sweep => commands::sweep::run(&ctx, &format).await?,
        Commands::Alerts(cmd) => commands::alerts::run(cmd, &ctx, &format).await?,
    }

    Ok(())
}
