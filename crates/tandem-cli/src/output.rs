//! Report rendering for `check` and `reconcile`.

use crate::cli::OutputFormat;
use anyhow::Result;
use tandem_sync::{Evaluation, ResourceReport};

/// Render one line per report, or a JSON array.
pub fn render_reports(reports: &[ResourceReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        OutputFormat::Text => Ok(reports
            .iter()
            .map(render_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn render_line(report: &ResourceReport) -> String {
    let id = &report.resource_id;
    if let Some(error) = &report.error {
        return format!("error     {id}: {error}");
    }
    if report.written {
        return format!("fixed     {id}");
    }
    match &report.evaluation {
        Some(Evaluation::DoneMismatch {
            status,
            expected,
            actual,
        }) => {
            let actual = actual.map_or_else(|| "missing".to_string(), |a| a.to_string());
            format!("mismatch  {id}: status '{status}' wants done={expected}, found {actual}")
        }
        Some(Evaluation::NoStatus) => format!("no-status {id}"),
        Some(Evaluation::InSync) | None => format!("ok        {id}"),
    }
}

/// One-line summary.
pub fn summary(reports: &[ResourceReport]) -> String {
    let problems = reports.iter().filter(|r| r.is_problem()).count();
    let written = reports.iter().filter(|r| r.written).count();
    format!(
        "{} resources, {} need attention, {} fixed",
        reports.len(),
        problems,
        written
    )
}
