//! Error types for the audit run.
//!
//! Only conditions that should stop the whole run live here. A site that
//! cannot be reached is not an error: the fetcher collapses every transport
//! failure into "no response" and the classifier records it as data.

use thiserror::Error;

/// Errors that abort an audit run.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Reading or writing the dataset, config or report failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file is not valid JSON for the expected schema.
    #[error("failed to parse links file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The YAML config file could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A config value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// One of the two tracked groups is absent from the dataset.
    #[error("links file has no group named '{0}'")]
    MissingGroup(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Serializing the report or dataset failed.
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl AuditError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
