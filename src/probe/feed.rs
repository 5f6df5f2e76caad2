//! Feed date extraction.
//!
//! RSS and Atom feeds expose timestamps in a handful of well-known elements.
//! The extractor walks the markup with `quick-xml`, collects the text of every
//! date-bearing element (anywhere in the document, so every item of a
//! multi-item feed contributes), and returns the most recent date that parses.
//!
//! | Element         | Seen in                   |
//! |-----------------|---------------------------|
//! | `pubDate`       | RSS 2.0 channel and items |
//! | `lastBuildDate` | RSS 2.0 channel           |
//! | `published`     | Atom entries              |
//! | `updated`       | Atom feed and entries     |
//! | `dc:date`       | RSS 1.0 / Dublin Core     |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, trace};

/// Element names, lowercased, whose text is a date.
const DATE_TAGS: &[&str] = &["pubdate", "published", "updated", "dc:date", "lastbuilddate"];

fn is_date_tag(qname: &[u8]) -> bool {
    let name = String::from_utf8_lossy(qname).to_ascii_lowercase();
    DATE_TAGS.contains(&name.as_str())
}

/// Parse a timestamp as feeds and HTTP servers write them.
///
/// Tries RFC 2822 (which covers HTTP-dates), RFC 3339, then a few naive
/// layouts that are taken to be UTC.
///
/// # Returns
///
/// The parsed instant in UTC, or `None` if no layout matches.
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Return the most recent date found in a feed document.
///
/// Unparseable element text is skipped. A syntax error ends the scan but
/// keeps whatever was collected before it.
///
/// # Arguments
///
/// * `text` - Raw RSS, Atom or RDF markup
///
/// # Returns
///
/// The latest timestamp among all `pubDate`, `published`, `updated`,
/// `dc:date` and `lastBuildDate` elements, or `None` if none parse.
pub fn extract_feed_date(text: &str) -> Option<DateTime<Utc>> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;

    let mut capture: Option<String> = None;
    let mut latest: Option<DateTime<Utc>> = None;
    let mut candidates = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                capture = is_date_tag(e.name().as_ref()).then(String::new);
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(buf) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(raw) = capture.take() {
                    candidates += 1;
                    match parse_date_text(&raw) {
                        Some(date) => {
                            if latest.is_none_or(|current| date > current) {
                                latest = Some(date);
                            }
                        }
                        None => trace!(raw = %raw, "Discarding unparseable feed date"),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(
                    position = reader.buffer_position(),
                    error = %e,
                    "Feed markup error; keeping dates found so far"
                );
                break;
            }
        }
    }

    debug!(candidates, latest = ?latest, "Scanned feed for dates");
    latest
}
