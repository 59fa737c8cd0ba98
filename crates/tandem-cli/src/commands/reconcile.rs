use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::output;

/// Fix every inconsistent resource once. Returns whether any could not be
/// handled.
pub async fn execute(vault: &Path, config: Option<&Path>, format: OutputFormat) -> Result<bool> {
    let (_, service) = super::open_vault(vault, config).await?;
    let reports = service.reconcile_all().await?;

    println!("{}", output::render_reports(&reports, format)?);
    if format == OutputFormat::Text {
        println!("\n{}", output::summary(&reports));
    }
    Ok(reports.iter().any(|r| r.error.is_some()))
}
