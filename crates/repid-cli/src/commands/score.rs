// crates/repid-cli/src/commands/score.rs
//
// `repid score <entity>`: aggregated score or the neutral baseline.

use tabled::Tabled;

use repid_core::EntityKey;

use super::Context;
use crate::output::{emit, fixed2, OutputFormat};

#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Composite")]
    composite: String,
    #[tabled(rename = "Factual")]
    factual: String,
    #[tabled(rename = "Truthful")]
    truthful: String,
    #[tabled(rename = "Authentic")]
    authentic: String,
    #[tabled(rename = "Helpful")]
    helpful: String,
    #[tabled(rename = "Ratings")]
    ratings: u64,
    #[tabled(rename = "Prior")]
    prior: String,
    #[tabled(rename = "Risk %")]
    risk: String,
}

/// Run the score subcommand.
pub async fn run(
    entity: &str,
    recompute: bool,
    ctx: &Context,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let key: EntityKey = entity.parse()?;
    let view = if recompute {
        ctx.engine.recompute(&key).await?
    } else {
        ctx.engine.get_aggregated_score(&key).await?
    };

    let row = ScoreRow {
        entity: view.entity.to_string(),
        composite: fixed2(view.composite),
        factual: fixed2(view.dimensions.factual),
        truthful: fixed2(view.dimensions.truthful),
        authentic: fixed2(view.dimensions.authentic),
        helpful: fixed2(view.dimensions.helpful),
        ratings: view.total_ratings,
        prior: fixed2(view.bayesian_weight),
        risk: fixed2(view.manipulation_risk),
    };
    emit(format, &view, &[row]);
    if !view.has_ratings && *format == OutputFormat::Table {
        println!("No ratings yet: neutral baseline shown.");
    }
    Ok(())
}
