use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::RecurringService;

#[derive(Subcommand)]
pub enum RecurringCommands {
    #[command(about = "Duplicate overdue cards on recurring boards once, now")]
    Run,
}

pub async fn handle(cmd: RecurringCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RecurringCommands::Run => {
            let report = RecurringService::new().await?.run().await?;
            DatabaseManager::close().await;

            output_success(
                &output_format,
                &format!(
                    "Recurring run complete: {} boards, {} cards duplicated, {} failed",
                    report.boards, report.duplicated, report.failed
                ),
                Some(json!(report)),
            )
        }
    }
}
