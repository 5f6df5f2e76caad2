//! Command-line interface definitions for Friend Link Audit.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also come from environment variables or the YAML config
//! file; flags given here win over both.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Friend Link Audit application.
///
/// # Examples
///
/// ```sh
/// # Audit the links file in place
/// friend_link_audit ./data/links.json
///
/// # See what would change without touching the file
/// friend_link_audit ./data/links.json --dry-run --report ./out/report.json
///
/// # Use custom group names and a shorter staleness window
/// friend_link_audit ./data/links.json --active-group Friends --inactive-group Lost --stale-after-days 90
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the friend-links JSON file
    #[arg(env = "FRIEND_LINKS_FILE")]
    pub links: PathBuf,

    /// Optional path to a config.yaml file
    #[arg(short, long, env = "FRIEND_LINKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Name of the group holding active links
    #[arg(long)]
    pub active_group: Option<String>,

    /// Name of the group holding inactive links
    #[arg(long)]
    pub inactive_group: Option<String>,

    /// Days without an update before a site counts as inactive
    #[arg(long)]
    pub stale_after_days: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// User-Agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Probe and classify, but do not write the links file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write a JSON report of the pass to this path
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}
