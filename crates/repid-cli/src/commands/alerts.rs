// crates/repid-cli/src/commands/alerts.rs
//
// `repid alerts {list, review}`: manipulation alert inspection and workflow.

use clap::Subcommand;
use tabled::Tabled;
use uuid::Uuid;

use repid_core::{AlertStatus, ManipulationAlert};

use super::Context;
use crate::output::{emit, OutputFormat};

/// Alert subcommands.
#[derive(Debug, Subcommand)]
pub enum AlertsCmd {
    /// List alerts, newest first.
    List {
        /// Filter by status: pending, under_review, confirmed, false_positive, resolved.
        #[arg(long)]
        status: Option<String>,
    },
    /// Move an alert to its next review status.
    Review {
        /// Alert UUID.
        id: String,
        /// Target status.
        #[arg(long)]
        status: String,
        #[arg(long)]
        reviewer: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Entities")]
    entities: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&ManipulationAlert> for AlertRow {
    fn from(alert: &ManipulationAlert) -> Self {
        Self {
            id: alert.id.to_string(),
            method: alert.method.as_str().to_string(),
            severity: alert.severity.to_string(),
            status: alert.status.to_string(),
            entities: alert
                .entities
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            created: alert.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Run the alerts subcommand.
pub async fn run(
    cmd: &AlertsCmd,
    ctx: &Context,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        AlertsCmd::List { status } => {
            let status: Option<AlertStatus> = status.as_deref().map(str::parse::<AlertStatus>).transpose()?;
            let alerts = ctx.sweep.list_alerts(status).await?;
            if alerts.is_empty() && *format == OutputFormat::Table {
                println!("No alerts.");
                return Ok(());
            }
            let rows: Vec<AlertRow> = alerts.iter().map(AlertRow::from).collect();
            emit(format, &alerts, &rows);
        }
        AlertsCmd::Review {
            id,
            status,
            reviewer,
            notes,
        } => {
            let id: Uuid = id.parse()?;
            let next: AlertStatus = status.parse()?;
            let alert = ctx
                .sweep
                .review_alert(&id, next, reviewer.clone(), notes.clone())
                .await?;
            emit(format, &alert, &[AlertRow::from(&alert)]);
        }
    }

    Ok(())
}
