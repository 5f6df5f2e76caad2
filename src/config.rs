//! Run configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags. A config file only needs the keys it overrides:
//!
//! ```yaml
//! active_group: Friends
//! inactive_group: Lost contact
//! stale_after_days: 120
//! timeout_secs: 8
//! feed_paths:
//!   - /rss.xml
//!   - /atom.xml
//!   - /feed
//! ```

use crate::cli::Cli;
use crate::error::AuditError;
use crate::probe::fetcher::DEFAULT_USER_AGENT;
use crate::probe::{DEFAULT_FEED_PATHS, DEFAULT_TIMEOUT};
use crate::reconcile::DEFAULT_STALE_AFTER_DAYS;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument};

/// Fully resolved settings for one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    pub active_group: String,
    pub inactive_group: String,
    pub stale_after_days: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub feed_paths: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            active_group: "active".to_string(),
            inactive_group: "inactive".to_string(),
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_paths: DEFAULT_FEED_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl AuditConfig {
    /// Parse a YAML config file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, AuditError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| AuditError::io(path, e))?;
        let config = Self::from_yaml(&raw).map_err(|source| AuditError::Config {
            path: path.display().to_string(),
            source,
        })?;
        debug!(?config, "Loaded config file");
        Ok(config)
    }

    fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Resolve the settings for a run from the CLI and its optional config file.
    pub async fn resolve(cli: &Cli) -> Result<Self, AuditError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path).await?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Let command-line flags override file and default values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(name) = &cli.active_group {
            self.active_group = name.clone();
        }
        if let Some(name) = &cli.inactive_group {
            self.inactive_group = name.clone();
        }
        if let Some(days) = cli.stale_after_days {
            self.stale_after_days = days;
        }
        if let Some(secs) = cli.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(agent) = &cli.user_agent {
            self.user_agent = agent.clone();
        }
    }

    /// Reject settings that would make a pass meaningless.
    pub fn validate(&self) -> Result<(), AuditError> {
        let invalid = |msg: String| Err(AuditError::InvalidConfig(msg));
        if self.active_group == self.inactive_group {
            return invalid(format!(
                "active and inactive groups must differ (both are '{}')",
                self.active_group
            ));
        }
        if self.stale_after_days == 0 {
            return invalid("stale_after_days must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return invalid("timeout_secs must be at least 1".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return invalid("user_agent must not be empty".to_string());
        }
        if let Some(path) = self.feed_paths.iter().find(|p| !p.starts_with('/')) {
            return invalid(format!("feed path '{path}' must start with '/'"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
