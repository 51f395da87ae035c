//! Rendering run results
//!
//! Per-check lines are printed while the run is in progress; once the session
//! is released the run closes with either the text summary or the JSON
//! document for CI.

use crate::error::{HarnessError, Result};
use crate::harness::{CheckOutcome, CheckStatus, RunReport};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One transcript line for a finished check
pub fn outcome_line(outcome: &CheckOutcome) -> String {
    match outcome.status {
        CheckStatus::Passed => match outcome.message.as_deref() {
            Some(detail) if !detail.is_empty() => {
                format!("✅ Test {} Passed: {}: {}", outcome.index, outcome.label, detail)
            }
            _ => format!("✅ Test {} Passed: {}", outcome.index, outcome.label),
        },
        CheckStatus::Failed => format!(
            "❌ Test {} Failed: {}: {}",
            outcome.index,
            outcome.label,
            outcome.message.as_deref().unwrap_or("no message")
        ),
        CheckStatus::Skipped => format!("⏭️  Test {} Skipped: {}", outcome.index, outcome.label),
    }
}

/// Closing text block: the summary line, and a cheer when everything passed
pub fn render_summary(report: &RunReport) -> String {
    if report.is_success() {
        format!("{}\n😸 All tests passed! 🎉", report.summary_line())
    } else {
        report.summary_line()
    }
}

/// What the run prints once the session has been released
pub fn render(report: &RunReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_summary(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| HarnessError::Other(format!("Failed to serialize report: {}", e))),
    }
}

/// Write the JSON report to a file
pub async fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = render(report, OutputFormat::Json)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}
