//! Classification and group reconciliation.
//!
//! One reconciliation pass probes every entry of the two tracked groups,
//! updates each entry's audit fields in place, and then regroups entries
//! whose classification no longer matches the group they sit in.
//!
//! # Two phases
//!
//! 1. **Scan**: both groups are walked in order. Each entry is probed and
//!    classified; moves are only recorded, by the entry's position in its
//!    source group, so no entry is seen twice in one pass.
//! 2. **Apply**: recorded entries are removed from their source group and
//!    appended to the destination group in scan order. Entries that stay put
//!    keep their relative order.
//!
//! # Transitions
//!
//! | Probe result                    | Status      | Move              |
//! |---------------------------------|-------------|-------------------|
//! | unreachable                     | unreachable | active → inactive |
//! | dated, older than the cutoff    | inactive    | active → inactive |
//! | dated, at or after the cutoff   | active      | inactive → active |
//! | undated, was unreachable        | active      | inactive → active |
//! | undated, otherwise              | unchanged   | none              |

use crate::error::AuditError;
use crate::models::{ActivityResult, DateSource, LinkEntry, LinkStatus, LinksDocument, Placement};
use crate::probe::SiteProber;
use crate::probe::fetcher::PageFetcher;
use crate::utils::days_before;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Default staleness threshold: six thirty-day months.
pub const DEFAULT_STALE_AFTER_DAYS: u32 = 6 * 30;

/// What the classifier decided for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// New status, or `None` to leave the current one untouched.
    pub status: Option<LinkStatus>,
    /// Group the entry should move to, if it must move.
    pub move_to: Option<Placement>,
}

impl Verdict {
    const UNCHANGED: Verdict = Verdict {
        status: None,
        move_to: None,
    };

    fn settle(status: LinkStatus, placement: Placement, home: Placement) -> Self {
        Verdict {
            status: Some(status),
            move_to: (placement != home).then_some(home),
        }
    }
}

/// Classify one probe result for an entry currently in `placement`.
///
/// # Arguments
///
/// * `placement` - Group the entry sits in during the scan
/// * `prior` - Status stored on the entry before this pass
/// * `result` - What the prober found
/// * `cutoff` - Dates strictly before this are stale
///
/// # Returns
///
/// A [`Verdict`] carrying the new status (if any) and the destination
/// group when the entry sits in the wrong one.
pub fn classify(
    placement: Placement,
    prior: Option<LinkStatus>,
    result: &ActivityResult,
    cutoff: DateTime<Utc>,
) -> Verdict {
    if !result.reachable {
        return Verdict::settle(LinkStatus::Unreachable, placement, Placement::Inactive);
    }
    match result.last_active {
        Some(date) if date < cutoff => {
            Verdict::settle(LinkStatus::Inactive, placement, Placement::Inactive)
        }
        Some(_) => Verdict::settle(LinkStatus::Active, placement, Placement::Active),
        None if placement == Placement::Inactive && prior == Some(LinkStatus::Unreachable) => {
            Verdict::settle(LinkStatus::Active, placement, Placement::Active)
        }
        None => Verdict::UNCHANGED,
    }
}

/// Per-entry record of a pass, kept for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub name: String,
    pub link: String,
    pub group: Placement,
    pub reachable: bool,
    pub status: Option<LinkStatus>,
    pub last_active: Option<NaiveDate>,
    pub source: Option<DateSource>,
    pub moved_to: Option<Placement>,
}

/// Totals for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub checked: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub moved_to_active: usize,
    pub moved_to_inactive: usize,
    pub outcomes: Vec<EntryOutcome>,
}

impl PassSummary {
    pub fn moved(&self) -> usize {
        self.moved_to_active + self.moved_to_inactive
    }
}

/// Runs reconciliation passes over a [`LinksDocument`].
#[derive(Debug)]
pub struct Reconciler<F> {
    prober: SiteProber<F>,
    active_group: String,
    inactive_group: String,
    stale_after_days: u32,
}

impl<F: PageFetcher> Reconciler<F> {
    pub fn new(
        prober: SiteProber<F>,
        active_group: impl Into<String>,
        inactive_group: impl Into<String>,
        stale_after_days: u32,
    ) -> Self {
        Self {
            prober,
            active_group: active_group.into(),
            inactive_group: inactive_group.into(),
            stale_after_days,
        }
    }

    /// Locate the two tracked groups.
    ///
    /// # Errors
    ///
    /// [`AuditError::MissingGroup`] naming the first group that is absent.
    pub fn tracked_groups(&self, doc: &LinksDocument) -> Result<(usize, usize), AuditError> {
        let find = |name: &str| {
            doc.group_index(name)
                .ok_or_else(|| AuditError::MissingGroup(name.to_string()))
        };
        Ok((find(&self.active_group)?, find(&self.inactive_group)?))
    }

    /// Probe every tracked entry and regroup the document.
    ///
    /// `now` is fixed for the whole pass: the staleness cutoff and the
    /// `lastChecked` stamp are both derived from it.
    ///
    /// # Returns
    ///
    /// Totals and per-entry outcomes of the pass.
    ///
    /// # Errors
    ///
    /// [`AuditError::MissingGroup`] before any request if a tracked group is
    /// absent. Probe failures never surface as errors.
    #[instrument(level = "info", skip_all, fields(active = %self.active_group, inactive = %self.inactive_group))]
    pub async fn run(
        &self,
        doc: &mut LinksDocument,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, AuditError> {
        let (active_idx, inactive_idx) = self.tracked_groups(doc)?;
        let cutoff = days_before(now, self.stale_after_days);
        let today = now.date_naive();
        info!(%cutoff, %today, "Starting reconciliation pass");

        let mut summary = PassSummary::default();
        let mut to_inactive: Vec<usize> = Vec::new();
        let mut to_active: Vec<usize> = Vec::new();

        for (placement, idx) in [
            (Placement::Active, active_idx),
            (Placement::Inactive, inactive_idx),
        ] {
            for (pos, entry) in doc.groups[idx].links.iter_mut().enumerate() {
                let result = self.prober.probe(&entry.link).await;
                let verdict = classify(placement, entry.status, &result, cutoff);
                record(entry, &result, &verdict, today);

                summary.checked += 1;
                if result.reachable {
                    summary.reachable += 1;
                } else {
                    summary.unreachable += 1;
                }
                match verdict.move_to {
                    Some(Placement::Inactive) => to_inactive.push(pos),
                    Some(Placement::Active) => to_active.push(pos),
                    None => {}
                }

                let outcome = EntryOutcome {
                    name: entry.name.clone(),
                    link: entry.link.clone(),
                    group: placement,
                    reachable: result.reachable,
                    status: entry.status,
                    last_active: entry.last_active,
                    source: result.source,
                    moved_to: verdict.move_to,
                };
                if result.reachable {
                    info!(
                        name = %outcome.name,
                        status = ?outcome.status,
                        last_active = ?outcome.last_active,
                        source = ?outcome.source,
                        moved_to = ?outcome.moved_to,
                        "Checked link"
                    );
                } else {
                    warn!(name = %outcome.name, link = %outcome.link, moved_to = ?outcome.moved_to, "Link unreachable");
                }
                summary.outcomes.push(outcome);
            }
        }

        let demoted = take_at(&mut doc.groups[active_idx].links, &to_inactive);
        let promoted = take_at(&mut doc.groups[inactive_idx].links, &to_active);
        summary.moved_to_inactive = demoted.len();
        summary.moved_to_active = promoted.len();
        doc.groups[inactive_idx].links.extend(demoted);
        doc.groups[active_idx].links.extend(promoted);

        info!(
            checked = summary.checked,
            unreachable = summary.unreachable,
            moved_to_active = summary.moved_to_active,
            moved_to_inactive = summary.moved_to_inactive,
            "Reconciliation pass complete"
        );
        Ok(summary)
    }
}

/// Write a verdict onto an entry, touching only fields whose value changes.
fn record(entry: &mut LinkEntry, result: &ActivityResult, verdict: &Verdict, today: NaiveDate) {
    if entry.last_checked != Some(today) {
        entry.last_checked = Some(today);
    }
    if let Some(date) = result.last_active.map(|d| d.date_naive()) {
        if entry.last_active != Some(date) {
            entry.last_active = Some(date);
        }
    }
    if let Some(status) = verdict.status {
        if entry.status != Some(status) {
            entry.status = Some(status);
        }
    }
}

/// Remove the entries at `positions` and return them in scan order.
///
/// `positions` must be ascending and refer to the group as it was scanned;
/// removal runs back to front so earlier positions stay valid.
fn take_at(links: &mut Vec<LinkEntry>, positions: &[usize]) -> Vec<LinkEntry> {
    let mut taken: Vec<LinkEntry> = Vec::new();
    for &pos in positions.iter().rev() {
        if pos < links.len() {
            taken.push(links.remove(pos));
        }
    }
    taken.reverse();
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkGroup;
    use crate::probe::tests::{ScriptedFetcher, feed_paths};
    use crate::probe::DEFAULT_TIMEOUT;
    use chrono::TimeZone;
    use serde_json::Map;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn cutoff() -> DateTime<Utc> {
        days_before(now(), DEFAULT_STALE_AFTER_DAYS)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn entry(name: &str, link: &str, status: Option<LinkStatus>) -> LinkEntry {
        LinkEntry {
            name: name.to_string(),
            intro: None,
            link: link.to_string(),
            avatar: None,
            last_checked: None,
            last_active: None,
            status,
            extra: Map::new(),
        }
    }

    fn doc(active: Vec<LinkEntry>, inactive: Vec<LinkEntry>) -> LinksDocument {
        let group = |name: &str, links| LinkGroup {
            name: name.to_string(),
            links,
            extra: Map::new(),
        };
        LinksDocument {
            groups: vec![group("active", active), group("inactive", inactive)],
            extra: Map::new(),
        }
    }

    fn reconciler(fetcher: ScriptedFetcher) -> Reconciler<ScriptedFetcher> {
        Reconciler::new(
            SiteProber::new(fetcher, feed_paths(), DEFAULT_TIMEOUT),
            "active",
            "inactive",
            DEFAULT_STALE_AFTER_DAYS,
        )
    }

    fn names(links: &[LinkEntry]) -> Vec<&str> {
        links.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_threshold_boundary() {
        let stale = ActivityResult::dated(at(2024, 1, 1), DateSource::Feed);
        let fresh = ActivityResult::dated(at(2024, 2, 1), DateSource::Feed);

        let v = classify(Placement::Active, Some(LinkStatus::Active), &stale, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Inactive));
        assert_eq!(v.move_to, Some(Placement::Inactive));

        let v = classify(Placement::Active, Some(LinkStatus::Active), &fresh, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Active));
        assert_eq!(v.move_to, None);
    }

    #[test]
    fn test_date_exactly_at_cutoff_is_active() {
        let edge = ActivityResult::dated(cutoff(), DateSource::PageContent);
        let v = classify(Placement::Inactive, Some(LinkStatus::Inactive), &edge, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Active));
        assert_eq!(v.move_to, Some(Placement::Active));
    }

    #[test]
    fn test_unreachable_always_wins() {
        let down = ActivityResult::unreachable();
        for prior in [None, Some(LinkStatus::Active), Some(LinkStatus::Inactive)] {
            let v = classify(Placement::Active, prior, &down, cutoff());
            assert_eq!(v.status, Some(LinkStatus::Unreachable));
            assert_eq!(v.move_to, Some(Placement::Inactive));
        }
        let v = classify(Placement::Inactive, Some(LinkStatus::Active), &down, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Unreachable));
        assert_eq!(v.move_to, None);
    }

    #[test]
    fn test_stale_in_inactive_stays() {
        let stale = ActivityResult::dated(at(2023, 1, 1), DateSource::LastModified);
        let v = classify(Placement::Inactive, None, &stale, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Inactive));
        assert_eq!(v.move_to, None);
    }

    #[test]
    fn test_undated_keeps_status() {
        let up = ActivityResult::undated();
        assert_eq!(
            classify(Placement::Active, Some(LinkStatus::Active), &up, cutoff()),
            Verdict::UNCHANGED
        );
        assert_eq!(
            classify(Placement::Inactive, Some(LinkStatus::Inactive), &up, cutoff()),
            Verdict::UNCHANGED
        );
        assert_eq!(
            classify(Placement::Active, Some(LinkStatus::Unreachable), &up, cutoff()),
            Verdict::UNCHANGED
        );
        assert_eq!(classify(Placement::Inactive, None, &up, cutoff()), Verdict::UNCHANGED);
    }

    #[test]
    fn test_undated_recovery_from_unreachable() {
        let up = ActivityResult::undated();
        let v = classify(Placement::Inactive, Some(LinkStatus::Unreachable), &up, cutoff());
        assert_eq!(v.status, Some(LinkStatus::Active));
        assert_eq!(v.move_to, Some(Placement::Active));
    }

    #[tokio::test]
    async fn test_recovery_moves_entry_to_active() {
        let fetcher = ScriptedFetcher::default().page(
            "https://back.example",
            200,
            "text/html",
            None,
            "<p>no dates here</p>",
        );
        let mut d = doc(
            vec![],
            vec![entry("Back", "https://back.example/", Some(LinkStatus::Unreachable))],
        );

        let summary = reconciler(fetcher).run(&mut d, now()).await.unwrap();

        assert_eq!(summary.moved_to_active, 1);
        assert!(d.groups[1].links.is_empty());
        let moved = &d.groups[0].links[0];
        assert_eq!(moved.name, "Back");
        assert_eq!(moved.status, Some(LinkStatus::Active));
        assert_eq!(moved.last_checked, Some(now().date_naive()));
    }

    #[tokio::test]
    async fn test_pass_moves_and_preserves_order() {
        let fetcher = ScriptedFetcher::default()
            .page("https://a.example", 200, "text/html", None, "<p>2024-06-01</p>")
            .page("https://c.example", 200, "text/html", None, "<p>2024-05-01</p>")
            .page("https://d.example", 200, "text/html", None, "<p>2021-01-01</p>")
            .page("https://e.example", 200, "text/html", None, "<p>2024-06-10</p>")
            .page("https://f.example", 200, "text/html", None, "<p>2022-01-01</p>");
        let mut d = doc(
            vec![
                entry("A", "https://a.example", Some(LinkStatus::Active)),
                entry("B", "https://b.example", Some(LinkStatus::Active)),
                entry("C", "https://c.example", None),
                entry("D", "https://d.example", Some(LinkStatus::Active)),
            ],
            vec![
                entry("E", "https://e.example", Some(LinkStatus::Inactive)),
                entry("F", "https://f.example", Some(LinkStatus::Inactive)),
            ],
        );

        let summary = reconciler(fetcher).run(&mut d, now()).await.unwrap();

        assert_eq!(summary.checked, 6);
        assert_eq!(summary.unreachable, 1);
        assert_eq!(summary.moved_to_inactive, 2);
        assert_eq!(summary.moved_to_active, 1);
        assert_eq!(names(&d.groups[0].links), vec!["A", "C", "E"]);
        assert_eq!(names(&d.groups[1].links), vec!["F", "B", "D"]);

        let b = &d.groups[1].links[1];
        assert_eq!(b.status, Some(LinkStatus::Unreachable));
        let d_entry = &d.groups[1].links[2];
        assert_eq!(d_entry.status, Some(LinkStatus::Inactive));
        assert_eq!(d_entry.last_active, NaiveDate::from_ymd_opt(2021, 1, 1));

        let today = now().date_naive();
        assert!(
            d.groups
                .iter()
                .flat_map(|g| &g.links)
                .all(|e| e.last_checked == Some(today))
        );
    }

    #[tokio::test]
    async fn test_unreachable_keeps_last_active() {
        let mut down = entry("Down", "https://down.example", Some(LinkStatus::Active));
        down.last_active = NaiveDate::from_ymd_opt(2024, 6, 30);
        let mut d = doc(vec![down], vec![]);

        reconciler(ScriptedFetcher::default())
            .run(&mut d, now())
            .await
            .unwrap();

        let moved = &d.groups[1].links[0];
        assert_eq!(moved.status, Some(LinkStatus::Unreachable));
        assert_eq!(moved.last_active, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[tokio::test]
    async fn test_second_pass_changes_nothing() {
        let script = || {
            ScriptedFetcher::default()
                .page("https://a.example", 200, "text/html", None, "<p>2021-01-01</p>")
                .page("https://b.example", 200, "text/html", None, "<p>2024-06-01</p>")
        };
        let mut d = doc(
            vec![entry("A", "https://a.example", Some(LinkStatus::Active))],
            vec![entry("B", "https://b.example", Some(LinkStatus::Inactive))],
        );

        let first = reconciler(script()).run(&mut d, now()).await.unwrap();
        assert_eq!(first.moved(), 2);
        let after_first = d.clone();

        let second = reconciler(script()).run(&mut d, now()).await.unwrap();
        assert_eq!(second.moved(), 0);
        assert_eq!(d, after_first);
    }

    #[tokio::test]
    async fn test_missing_group_is_fatal_before_probing() {
        let mut d = doc(vec![entry("A", "https://a.example", None)], vec![]);
        d.groups.remove(1);
        let r = reconciler(ScriptedFetcher::default());

        let err = r.run(&mut d, now()).await.unwrap_err();

        assert!(matches!(err, AuditError::MissingGroup(ref name) if name == "inactive"));
        assert!(r.prober.fetcher().requested.borrow().is_empty());
    }

    #[test]
    fn test_take_at_keeps_scan_order() {
        let mut links = vec![
            entry("One", "https://dup.example", None),
            entry("Two", "https://x.example", None),
            entry("Three", "https://dup.example/", None),
        ];
        let taken = take_at(&mut links, &[0, 2]);
        assert_eq!(names(&taken), vec!["One", "Three"]);
        assert_eq!(names(&links), vec!["Two"]);
    }

    #[tokio::test]
    async fn test_duplicate_links_move_only_the_classified_entry() {
        let fetcher = ScriptedFetcher::default().page(
            "https://x.example",
            200,
            "text/html",
            None,
            "<p>nothing dated</p>",
        );
        let mut d = doc(
            vec![],
            vec![
                entry("Stays", "https://x.example", Some(LinkStatus::Inactive)),
                entry("Recovers", "https://x.example/", Some(LinkStatus::Unreachable)),
            ],
        );

        let summary = reconciler(fetcher).run(&mut d, now()).await.unwrap();

        assert_eq!(summary.moved_to_active, 1);
        assert_eq!(names(&d.groups[0].links), vec!["Recovers"]);
        assert_eq!(names(&d.groups[1].links), vec!["Stays"]);
        assert_eq!(d.groups[0].links[0].status, Some(LinkStatus::Active));
        assert_eq!(d.groups[1].links[0].status, Some(LinkStatus::Inactive));
    }
}
