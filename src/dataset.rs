//! Loading and saving the friend-links JSON file.
//!
//! # Write-if-changed
//!
//! The document is re-serialized with two-space indentation and a trailing
//! newline. The file is only written when that output differs byte for byte
//! from what was read, so a pass that changes nothing leaves the file (and
//! its modification time) alone. Writes go to a sibling temporary file that
//! is then renamed over the original.

use crate::error::AuditError;
use crate::models::LinksDocument;
use crate::utils::ensure_parent_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// A parsed document along with the exact text it was parsed from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: LinksDocument,
    pub original: String,
}

/// Read and parse the links file.
///
/// # Errors
///
/// IO failures and JSON that does not match the schema are returned as is.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path) -> Result<LoadedDocument, AuditError> {
    let original = fs::read_to_string(path)
        .await
        .map_err(|e| AuditError::io(path, e))?;
    let document: LinksDocument =
        serde_json::from_str(&original).map_err(|source| AuditError::Json {
            path: path.display().to_string(),
            source,
        })?;
    info!(
        groups = document.groups.len(),
        links = document.groups.iter().map(|g| g.links.len()).sum::<usize>(),
        "Loaded links file"
    );
    Ok(LoadedDocument { document, original })
}

/// Serialize a document the way it is stored on disk.
pub fn render(document: &LinksDocument) -> Result<String, AuditError> {
    let mut out = serde_json::to_string_pretty(document).map_err(|source| AuditError::Serialize {
        what: "links document",
        source,
    })?;
    out.push('\n');
    Ok(out)
}

/// Write `document` to `path` unless it serializes to exactly `original`.
///
/// Returns whether the file was written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn save(path: &Path, document: &LinksDocument, original: &str) -> Result<bool, AuditError> {
    let rendered = render(document)?;
    if rendered == original {
        debug!("Links file unchanged; skipping write");
        return Ok(false);
    }

    ensure_parent_dir(path)
        .await
        .map_err(|e| AuditError::io(path, e))?;
    let tmp = temp_path(path);
    fs::write(&tmp, rendered.as_bytes())
        .await
        .map_err(|e| AuditError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| AuditError::io(path, e))?;
    info!(bytes = rendered.len(), "Wrote links file");
    Ok(true)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
