//! Data models for the friend-links dataset and probe results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`LinksDocument`]: The persisted dataset, a list of named groups
//! - [`LinkGroup`]: One named, ordered collection of links
//! - [`LinkEntry`]: A single friend link and its audit state
//! - [`ActivityResult`]: What one probe learned about a site
//!
//! Keys are camelCase to match the JSON file maintained by hand alongside the
//! site. Keys the application does not know about are kept in `extra` maps so
//! that saving a document never drops them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Audit status recorded on a link. An entry that has never been audited
/// has no status at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Inactive,
    Unreachable,
}

/// A single friend link.
///
/// # Fields
///
/// * `name` - Display name of the site
/// * `link` - Site URL, also used as the entry's identity within a group
/// * `last_checked` - Date of the last audit pass that probed this entry
/// * `last_active` - Most recent update date ever detected for the site
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named, ordered collection of links.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinkGroup {
    pub name: String,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole persisted dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinksDocument {
    pub groups: Vec<LinkGroup>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinksDocument {
    /// Position of the group called `name`, if any.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }
}

/// Which tracked group an entry currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Active,
    Inactive,
}

/// Where a site's last-active date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Feed,
    LastModified,
    PageContent,
}

/// Outcome of probing one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityResult {
    pub reachable: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub source: Option<DateSource>,
}

impl ActivityResult {
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            last_active: None,
            source: None,
        }
    }

    pub fn undated() -> Self {
        Self {
            reachable: true,
            last_active: None,
            source: None,
        }
    }

    pub fn dated(date: DateTime<Utc>, source: DateSource) -> Self {
        Self {
            reachable: true,
            last_active: Some(date),
            source: Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
  "groups": [
    {
      "name": "active",
      "links": [
        {
          "name": "Alice",
          "intro": "Notes on compilers",
          "link": "https://alice.example/",
          "avatar": "https://alice.example/a.png",
          "lastChecked": "2024-06-30",
          "lastActive": "2024-06-01",
          "status": "active",
          "color": "#ff0000"
        }
      ]
    },
    {
      "name": "inactive",
      "links": []
    }
  ],
  "version": 2
}"##;

    #[test]
    fn test_document_deserialization() {
        let doc: LinksDocument = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(doc.groups.len(), 2);
        let entry = &doc.groups[0].links[0];
        assert_eq!(entry.name, "Alice");
        assert_eq!(entry.status, Some(LinkStatus::Active));
        assert_eq!(
            entry.last_active,
            Some(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        );
        assert_eq!(entry.extra.get("color"), Some(&Value::from("#ff0000")));
        assert_eq!(doc.extra.get("version"), Some(&Value::from(2)));
    }

    #[test]
    fn test_unset_status_is_omitted() {
        let entry: LinkEntry =
            serde_json::from_str(r#"{"name":"Bob","link":"https://bob.example"}"#).unwrap();
        assert_eq!(entry.status, None);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"Bob","link":"https://bob.example"}"#);
    }

    #[test]
    fn test_reserialization_matches_input() {
        let doc: LinksDocument = serde_json::from_str(SAMPLE).unwrap();
        let out = serde_json::to_string_pretty(&doc).unwrap();
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_group_index() {
        let doc: LinksDocument = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(doc.group_index("inactive"), Some(1));
        assert_eq!(doc.group_index("missing"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&LinkStatus::Unreachable).unwrap();
        assert_eq!(json, r#""unreachable""#);
        let json = serde_json::to_string(&DateSource::LastModified).unwrap();
        assert_eq!(json, r#""last_modified""#);
    }
}
