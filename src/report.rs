//! JSON report of a reconciliation pass.
//!
//! The report is a one-shot snapshot meant for CI logs or a status page:
//!
//! ```text
//! {
//!   "generatedAt": "2024-07-01T00:00:00Z",
//!   "linksFile": "data/links.json",
//!   "dryRun": false,
//!   "fileWritten": true,
//!   "summary": { "checked": 12, "moved_to_inactive": 1, ... }
//! }
//! ```

use crate::error::AuditError;
use crate::reconcile::PassSummary;
use crate::utils::ensure_parent_dir;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Everything worth knowing about one pass after it finished.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub links_file: String,
    pub dry_run: bool,
    pub file_written: bool,
    pub summary: &'a PassSummary,
}

/// Write a [`PassReport`] as pretty JSON, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &PassReport<'_>, path: &Path) -> Result<(), AuditError> {
    let json = serde_json::to_string_pretty(report).map_err(|source| AuditError::Serialize {
        what: "pass report",
        source,
    })?;
    ensure_parent_dir(path)
        .await
        .map_err(|e| AuditError::io(path, e))?;
    fs::write(path, json).await.map_err(|e| AuditError::io(path, e))?;
    info!(entries = report.summary.outcomes.len(), "Wrote pass report");
    Ok(())
}
