//! Page date extraction.
//!
//! Last resort when a site has no feed and no `Last-Modified` header: mine
//! the raw markup for anything that looks like a calendar date. Matches are
//! best effort, so numeric candidates must fall on a real calendar day no
//! earlier than [`PLAUSIBLE_YEAR_FLOOR`]; that filters out version strings,
//! phone numbers and copyright footers from the last century.
//!
//! The English month-name pattern (`March 5, 2024`) is matched and logged,
//! but its hits do not enter the candidate pool.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

/// Earliest year a scraped page date may carry.
pub const PLAUSIBLE_YEAR_FLOOR: i32 = 2020;

/// One textual date pattern applied to page markup.
struct PagePattern {
    name: &'static str,
    regex: Regex,
    /// Whether this pattern's hits count as candidates.
    merged: bool,
}

static PATTERNS: Lazy<[PagePattern; 3]> = Lazy::new(|| {
    [
        PagePattern {
            name: "iso",
            regex: Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid ISO date regex"),
            merged: true,
        },
        PagePattern {
            name: "cjk",
            regex: Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日")
                .expect("valid CJK date regex"),
            merged: true,
        },
        PagePattern {
            name: "month_name",
            regex: Regex::new(
                r"(?i)\b(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b",
            )
            .expect("valid month-name date regex"),
            merged: false,
        },
    ]
});

fn numeric_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    if year < PLAUSIBLE_YEAR_FLOOR {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Return the most recent plausible date written in a page, at midnight UTC.
///
/// Only ISO (`2024-01-05`) and CJK (`2024年1月5日`) dates are candidates.
/// Years before 2020 and impossible calendar days are discarded.
///
/// # Arguments
///
/// * `html` - Page body; markup is scanned as plain text
///
/// # Returns
///
/// The latest candidate date, or `None` if the page has none.
pub fn extract_page_date(html: &str) -> Option<DateTime<Utc>> {
    let mut latest: Option<NaiveDate> = None;

    for pattern in PATTERNS.iter() {
        let regex = &pattern.regex;
        if !pattern.merged {
            let hits = regex.find_iter(html).count();
            if hits > 0 {
                debug!(pattern = pattern.name, hits, "Matched dates not used as candidates");
            }
            continue;
        }

        let mut accepted = 0usize;
        for caps in regex.captures_iter(html) {
            if let Some(date) = numeric_date(&caps) {
                accepted += 1;
                if latest.is_none_or(|current| date > current) {
                    latest = Some(date);
                }
            }
        }
        debug!(pattern = pattern.name, accepted, "Scanned page for dates");
    }

    latest
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
