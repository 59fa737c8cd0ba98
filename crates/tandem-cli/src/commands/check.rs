use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::cli::OutputFormat;
use crate::output;

/// Evaluate every tracked resource. Returns whether any needs attention.
pub async fn execute(vault: &Path, config: Option<&Path>, format: OutputFormat) -> Result<bool> {
    let (_, service) = super::open_vault(vault, config).await?;
    let reports = service.check_all().await?;
    info!(resources = reports.len(), "Check complete");

    println!("{}", output::render_reports(&reports, format)?);
    if format == OutputFormat::Text {
        println!("\n{}", output::summary(&reports));
    }
    Ok(reports.iter().any(|r| r.is_problem()))
}
