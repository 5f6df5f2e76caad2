//! Utility functions for URL handling, content-type sniffing and logging.

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;

/// Normalize a site URL into the base used for probing.
///
/// Surrounding whitespace and every trailing slash are removed, so
/// `https://a.example/` and `https://a.example` name the same site.
///
/// # Arguments
///
/// * `url` - Link as written in the links file
///
/// # Returns
///
/// The base URL onto which feed paths are appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_base_url(" https://a.example/ "), "https://a.example");
/// ```
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Whether a `Content-Type` header value names a syndication feed.
pub fn is_feed_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("xml") || ct.contains("rss") || ct.contains("atom")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and byte count appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits, otherwise the cut string with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Subtract a whole number of days from `now`.
pub fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - chrono::Duration::days(i64::from(days))
}

/// Create the parent directory of `path` if it has one.
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
