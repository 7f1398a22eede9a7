// crates/repid-cli/src/commands/tier.rs
//
// `repid tier`: access tier and hourly limit for an entity or a raw score.

use clap::Args;
use tabled::Tabled;

use repid_access::{rate_limit_for, AccessConfig};
use repid_core::EntityKey;

use super::Context;
use crate::output::{emit, fixed2, OutputFormat};

#[derive(Debug, Args)]
pub struct TierArgs {
    /// Entity as type:id; its current composite is used.
    #[arg(long, conflicts_with = "score")]
    pub entity: Option<String>,
    /// Raw composite score to evaluate.
    #[arg(long, required_unless_present = "entity")]
    pub score: Option<f64>,
    /// Cap on the effective limit.
    #[arg(long)]
    pub hard_ceiling: Option<u64>,
}

#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Base/hr")]
    base: u64,
    #[tabled(rename = "Multiplier")]
    multiplier: String,
    #[tabled(rename = "Limit/hr")]
    limit: u64,
}

/// Run the tier subcommand. `ctx` is only needed for `--entity`.
pub async fn run(
    args: &TierArgs,
    ctx: Option<&Context>,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ctx.map(|c| c.access.clone()).unwrap_or_default();
    if let Some(ceiling) = args.hard_ceiling {
        config = AccessConfig {
            hard_ceiling: ceiling,
            ..config
        };
    }

    let score = match (&args.entity, ctx) {
        (Some(entity), Some(ctx)) => {
            let key: EntityKey = entity.parse()?;
            ctx.engine.get_aggregated_score(&key).await?.composite
        }
        (Some(_), None) => return Err("--entity requires a data directory".into()),
        (None, _) => args.score.ok_or("either --entity or --score is required")?,
    };

    let limit = rate_limit_for(score, &config);
    let row = TierRow {
        score: fixed2(limit.score),
        tier: limit.tier.to_string(),
        base: limit.base_limit,
        multiplier: format!("{:.2}x", limit.multiplier),
        limit: limit.effective_limit,
    };
    emit(format, &limit, &[row]);
    Ok(())
}
