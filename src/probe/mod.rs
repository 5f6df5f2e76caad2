//! Site activity probing.
//!
//! A probe answers two questions about a friend link: is the site up, and
//! when did it last change. Sites expose the second answer inconsistently,
//! so the prober walks an ordered chain of date sources and stops at the
//! first one that yields a date:
//!
//! | Order | Source                | Module      | Reliability                |
//! |-------|-----------------------|-------------|----------------------------|
//! | 1     | Feed at a known path  | [`feed`]    | Structured, per-item dates |
//! | 2     | `Last-Modified`       | [`feed`]    | Asserted by the server     |
//! | 3     | Dates in the markup   | [`page`]    | Heuristic text scraping    |
//!
//! Reachability is decided by the main page alone. Requests are made one
//! at a time, each bounded by the configured timeout.

pub mod feed;
pub mod fetcher;
pub mod page;

use crate::models::{ActivityResult, DateSource};
use crate::utils::{is_feed_content_type, normalize_base_url, truncate_for_log};
use chrono::{DateTime, Utc};
use fetcher::{FetchedPage, PageFetcher};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Conventional feed locations, tried in order.
pub const DEFAULT_FEED_PATHS: &[&str] = &[
    "/rss.xml",
    "/atom.xml",
    "/feed",
    "/feed.xml",
    "/rss",
    "/index.xml",
];

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Date sources in the order they are consulted.
const DATE_CHAIN: [DateSource; 3] = [
    DateSource::Feed,
    DateSource::LastModified,
    DateSource::PageContent,
];

/// Probes sites through a [`PageFetcher`].
#[derive(Debug)]
pub struct SiteProber<F> {
    fetcher: F,
    feed_paths: Vec<String>,
    timeout: Duration,
}

impl<F: PageFetcher> SiteProber<F> {
    pub fn new(fetcher: F, feed_paths: Vec<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            feed_paths,
            timeout,
        }
    }

    /// Determine whether `url` is reachable and when it was last updated.
    ///
    /// The main page decides reachability. Date sources are then tried in
    /// order and the first one that yields a date ends the probe, so later
    /// sources are never requested.
    ///
    /// # Arguments
    ///
    /// * `url` - Site link as stored in the links file; trailing slashes are
    ///   ignored
    ///
    /// # Returns
    ///
    /// An [`ActivityResult`] that is unreachable, reachable but undated, or
    /// dated with the source that supplied the date.
    #[instrument(level = "info", skip_all, fields(url = %url))]
    pub async fn probe(&self, url: &str) -> ActivityResult {
        let base = normalize_base_url(url);
        if !is_http_url(&base) {
            warn!("Link is not an http(s) URL");
            return ActivityResult::unreachable();
        }

        let main_page = match self.fetcher.fetch(&base, self.timeout).await {
            Some(page) if page.is_success() => page,
            Some(page) => {
                warn!(status = %page.status, "Main page returned an error status");
                return ActivityResult::unreachable();
            }
            None => {
                warn!("Main page did not respond");
                return ActivityResult::unreachable();
            }
        };

        for source in DATE_CHAIN {
            let found = match source {
                DateSource::Feed => self.feed_date(&base).await,
                DateSource::LastModified => last_modified_date(&main_page),
                DateSource::PageContent => page::extract_page_date(&main_page.body),
            };
            if let Some(date) = found {
                debug!(?source, %date, "Found last-active date");
                return ActivityResult::dated(date, source);
            }
        }

        debug!("Site is up but exposes no usable date");
        ActivityResult::undated()
    }

    /// Walk the feed paths; the first feed that carries a date wins.
    async fn feed_date(&self, base: &str) -> Option<DateTime<Utc>> {
        for path in &self.feed_paths {
            let feed_url = format!("{base}{path}");
            let Some(response) = self.fetcher.fetch(&feed_url, self.timeout).await else {
                continue;
            };
            let is_feed = response.is_success()
                && response
                    .content_type
                    .as_deref()
                    .is_some_and(is_feed_content_type);
            if !is_feed {
                debug!(%feed_url, status = %response.status, "Not a feed");
                continue;
            }
            match feed::extract_feed_date(&response.body) {
                Some(date) => {
                    debug!(%feed_url, final_url = %response.url, "Using feed");
                    return Some(date);
                }
                None => debug!(
                    %feed_url,
                    preview = %truncate_for_log(&response.body, 160),
                    "Feed carries no parseable dates"
                ),
            }
        }
        None
    }
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

#[cfg(test)]
impl<F> SiteProber<F> {
    pub(crate) fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

fn last_modified_date(page: &FetchedPage) -> Option<DateTime<Utc>> {
    page.last_modified.as_deref().and_then(feed::parse_date_text)
}
