// crates/repid-cli/src/commands/submit.rs
//
// `repid submit`: record one rating through the full engine pipeline.

use clap::Args;
use tabled::Tabled;

use repid_core::{DimensionScores, EntityKey, EntityRef, RatingCategory, RatingSubmission};

use super::Context;
use crate::output::{emit, fixed2, OutputFormat};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Rater as type:id, e.g. user:42.
    #[arg(long)]
    pub rater: String,
    /// Target as type:id, e.g. agent:7.
    #[arg(long)]
    pub target: String,
    #[arg(long)]
    pub factual: f64,
    #[arg(long)]
    pub truthful: f64,
    #[arg(long)]
    pub authentic: f64,
    #[arg(long)]
    pub helpful: f64,
    /// peer, self, or challenge.
    #[arg(long, default_value = "peer")]
    pub category: String,
    #[arg(long, default_value_t = 1.0)]
    pub confidence: f64,
    /// Proof reference backing the rating.
    #[arg(long)]
    pub proof: Option<String>,
    /// Mark the proof as verified.
    #[arg(long, requires = "proof")]
    pub proof_verified: bool,
    /// Contextual justification reference.
    #[arg(long)]
    pub context: Option<String>,
    /// Free-text evidence.
    #[arg(long)]
    pub note: Option<String>,
    /// External address of the rater (wallet).
    #[arg(long)]
    pub rater_address: Option<String>,
    /// External address of the target (wallet).
    #[arg(long)]
    pub target_address: Option<String>,
}

#[derive(Tabled)]
struct ReceiptRow {
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Composite")]
    composite: String,
    #[tabled(rename = "Previous")]
    previous: String,
    #[tabled(rename = "Flagged")]
    flagged: String,
}

fn entity_ref(key: &str, address: &Option<String>) -> Result<EntityRef, Box<dyn std::error::Error>> {
    let key: EntityKey = key.parse()?;
    let mut entity = EntityRef::from(key);
    if let Some(address) = address {
        entity = entity.with_address(address.clone());
    }
    Ok(entity)
}

/// Run the submit subcommand.
pub async fn run(
    args: &SubmitArgs,
    ctx: &Context,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let category: RatingCategory = args.category.parse()?;
    let mut submission = RatingSubmission::new(
        entity_ref(&args.rater, &args.rater_address)?,
        entity_ref(&args.target, &args.target_address)?,
        DimensionScores::new(args.factual, args.truthful, args.authentic, args.helpful),
    )
    .with_category(category)
    .with_confidence(args.confidence);
    if let Some(proof) = &args.proof {
        submission = submission.with_proof(proof.clone(), args.proof_verified);
    }
    if let Some(context) = &args.context {
        submission = submission.with_context(context.clone());
    }
    submission.context_note = args.note.clone();

    let receipt = ctx.engine.submit_rating(submission).await?;

    let row = ReceiptRow {
        rating: receipt.rating_id.to_string(),
        target: receipt.target.to_string(),
        weight: format!("{:.3}", receipt.weight),
        composite: fixed2(receipt.composite),
        previous: receipt
            .previous_composite
            .map(fixed2)
            .unwrap_or_else(|| "--".to_string()),
        flagged: match &receipt.reason {
            Some(reason) if receipt.flagged => format!("yes: {}", reason),
            _ if receipt.flagged => "yes".to_string(),
            _ => "no".to_string(),
        },
    };
    emit(format, &receipt, &[row]);
    Ok(())
}
