//! # Friend Link Audit
//!
//! Checks every site on a curated friend-links list, decides whether each
//! one is still updated, and regroups the list into active and inactive
//! sections accordingly.
//!
//! ## Usage
//!
//! ```sh
//! friend_link_audit ./data/links.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Loading**: Read the links file and confirm both tracked groups exist
//! 2. **Probing**: Visit each site in turn (main page, then feeds, then the
//!    `Last-Modified` header, then dates scraped from the page)
//! 3. **Reconciling**: Classify each site and move entries between groups
//! 4. **Output**: Rewrite the links file if anything changed, and optionally
//!    write a JSON report of the pass

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod probe;
mod reconcile;
mod report;
mod utils;

use cli::Cli;
use config::AuditConfig;
use probe::SiteProber;
use probe::fetcher::HttpFetcher;
use reconcile::Reconciler;
use report::PassReport;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("friend_link_audit starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = AuditConfig::resolve(&args).await.inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;
    info!(
        active_group = %config.active_group,
        inactive_group = %config.inactive_group,
        stale_after_days = config.stale_after_days,
        timeout_secs = config.timeout_secs,
        feed_paths = config.feed_paths.len(),
        "Configuration resolved"
    );

    // ---- Load dataset and check preconditions before any network use ----
    let dataset::LoadedDocument {
        mut document,
        original,
    } = dataset::load(&args.links).await?;

    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let prober = SiteProber::new(fetcher, config.feed_paths.clone(), config.timeout());
    let reconciler = Reconciler::new(
        prober,
        config.active_group.clone(),
        config.inactive_group.clone(),
        config.stale_after_days,
    );
    if let Err(e) = reconciler.tracked_groups(&document) {
        error!(path = %args.links.display(), error = %e, "Links file is missing a tracked group");
        return Err(e.into());
    }

    // ---- Probe and reconcile ----
    let now = Utc::now();
    let summary = reconciler.run(&mut document, now).await?;

    // ---- Output ----
    let file_written = if args.dry_run {
        let would_change = dataset::render(&document)? != original;
        info!(would_change, "Dry run; links file left untouched");
        false
    } else {
        dataset::save(&args.links, &document, &original).await?
    };

    if let Some(report_path) = &args.report {
        let report = PassReport {
            generated_at: now,
            links_file: args.links.display().to_string(),
            dry_run: args.dry_run,
            file_written,
            summary: &summary,
        };
        if let Err(e) = report::write_report(&report, report_path).await {
            error!(path = %report_path.display(), error = %e, "Failed to write pass report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        checked = summary.checked,
        unreachable = summary.unreachable,
        moved = summary.moved(),
        moved_to_active = summary.moved_to_active,
        moved_to_inactive = summary.moved_to_inactive,
        file_written,
        "Execution complete"
    );

    Ok(())
}
