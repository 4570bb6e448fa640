//! Soft delete, the recycle bin, and the 30 day retention window.
//!
//! Deleted content keeps its row with `deleted_at` set. It can be restored
//! until it is purged, either by the owner or by the expiry sweep. Purging a
//! row also drops its template snapshots, except those a save still points
//! at: those stay behind as detached copies so other users keep their saves.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tome_db::queries::{content, snapshots};
use tome_types::ContentKind;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::lifecycle::load_owned_live;
use crate::{Caller, Engine, EngineError, Result};

pub const RETENTION_DAYS: i64 = 30;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// When a row deleted at `deleted_at` becomes eligible for purge.
pub fn purge_date(deleted_at: DateTime<Utc>) -> DateTime<Utc> {
    deleted_at + Duration::days(RETENTION_DAYS)
}

/// Whole days left before purge, rounded up, never negative.
pub fn days_remaining(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (purge_date(deleted_at) - now).num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    (ms + DAY_MS - 1) / DAY_MS
}

pub fn is_expired(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= purge_date(deleted_at)
}

#[derive(Debug, Clone)]
pub struct RecycleBinEntry {
    pub id: Uuid,
    pub kind: ContentKind,
    pub name: String,
    pub deleted_at: DateTime<Utc>,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeStatus {
    /// Every kind succeeded (possibly with nothing to purge).
    Complete,
    /// Some kinds purged, some failed.
    Partial,
    /// Every kind failed.
    Failed,
}

/// Per-kind outcome of a bulk purge. A failure in one kind never rolls back
/// another kind's work.
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub purged: Vec<(ContentKind, usize)>,
    pub failed: Vec<(ContentKind, String)>,
}

impl PurgeReport {
    pub fn status(&self) -> PurgeStatus {
        match (self.purged.is_empty(), self.failed.is_empty()) {
            (_, true) => PurgeStatus::Complete,
            (true, false) => PurgeStatus::Failed,
            (false, false) => PurgeStatus::Partial,
        }
    }

    pub fn total_purged(&self) -> usize {
        self.purged.iter().map(|(_, n)| n).sum()
    }

    fn record(&mut self, kind: ContentKind, outcome: anyhow::Result<usize>) {
        match outcome {
            Ok(n) => self.purged.push((kind, n)),
            Err(e) => {
                error!(%kind, "Purge failed: {:#}", e);
                self.failed.push((kind, e.to_string()));
            }
        }
    }
}

/// Hard delete one soft-deleted row and whatever of its template history is
/// not held by a save.
fn purge_row(conn: &Connection, kind: ContentKind, id: Uuid) -> anyhow::Result<()> {
    let dropped = snapshots::delete_unreferenced(conn, kind, id)?;
    snapshots::delete_counter(conn, kind, id)?;
    if content::delete_deleted(conn, kind, id)? == 0 {
        anyhow::bail!("{kind} {id} is not in the recycle bin");
    }
    if dropped > 0 {
        info!(%kind, %id, dropped, "Dropped unsaved snapshots with purged content");
    }
    Ok(())
}

impl Engine {
    pub fn soft_delete(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<()> {
        let now = self.now();
        self.db.with_tx(|tx| -> Result<()> {
            load_owned_live(tx, caller, kind, id)?;
            content::soft_delete(tx, kind, id, caller.user_id, now)?;
            Ok(())
        })?;

        info!(%kind, %id, "Content moved to recycle bin");
        Ok(())
    }

    /// Everything the caller has deleted, across all kinds, newest first.
    pub fn list_deleted(&self, caller: &Caller) -> Result<Vec<RecycleBinEntry>> {
        let now = self.now();
        let mut entries = Vec::new();

        for kind in ContentKind::ALL {
            let rows = self
                .db
                .with_conn(|conn| content::list_deleted_for_owner(conn, kind, caller.user_id))?;

            entries.extend(rows.into_iter().filter_map(|row| {
                let deleted_at = row.deleted_at?;
                Some(RecycleBinEntry {
                    id: row.id,
                    kind,
                    name: row.name,
                    deleted_at,
                    days_remaining: days_remaining(deleted_at, now),
                })
            }));
        }

        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(entries)
    }

    /// Restoring keeps the mode and reason the row had when it was deleted.
    pub fn restore(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<()> {
        let restored = self
            .db
            .with_conn_mut(|conn| content::restore(conn, kind, id, caller.user_id))?;
        if restored == 0 {
            return Err(EngineError::NotFound("Deleted item"));
        }

        info!(%kind, %id, "Content restored from recycle bin");
        Ok(())
    }

    pub fn purge(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<()> {
        self.db.with_tx(|tx| -> Result<()> {
            let row = content::get(tx, kind, id)?
                .filter(|row| row.is_deleted() && row.user_id == caller.user_id)
                .ok_or(EngineError::NotFound("Deleted item"))?;
            purge_row(tx, kind, row.id)?;
            Ok(())
        })?;

        info!(%kind, %id, "Content permanently deleted");
        Ok(())
    }

    /// Purge every deleted item the caller owns. Each kind runs in its own
    /// transaction and reports separately.
    pub fn empty_all(&self, caller: &Caller) -> PurgeReport {
        let mut report = PurgeReport::default();

        for kind in ContentKind::ALL {
            let outcome = self.db.with_tx(|tx| -> anyhow::Result<usize> {
                let rows = content::list_deleted_for_owner(tx, kind, caller.user_id)?;
                for row in &rows {
                    purge_row(tx, kind, row.id)?;
                }
                Ok(rows.len())
            });
            report.record(kind, outcome);
        }

        match report.status() {
            PurgeStatus::Complete => {
                info!(owner = %caller.user_id, purged = report.total_purged(), "Recycle bin emptied")
            }
            status => warn!(
                owner = %caller.user_id,
                purged = report.total_purged(),
                failed = report.failed.len(),
                ?status,
                "Recycle bin only partly emptied"
            ),
        }
        report
    }

    /// The retention sweep: purge every row, for every owner, whose
    /// retention window has run out by `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> PurgeReport {
        let mut report = PurgeReport::default();

        for kind in ContentKind::ALL {
            let outcome = self.db.with_tx(|tx| -> anyhow::Result<usize> {
                let expired: Vec<Uuid> = content::list_all_deleted(tx, kind)?
                    .into_iter()
                    .filter(|(_, deleted_at)| is_expired(*deleted_at, now))
                    .map(|(id, _)| id)
                    .collect();
                for id in &expired {
                    purge_row(tx, kind, *id)?;
                }
                Ok(expired.len())
            });
            report.record(kind, outcome);
        }

        if report.total_purged() > 0 || !report.failed.is_empty() {
            info!(
                purged = report.total_purged(),
                failed = report.failed.len(),
                "Expired content purged"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, user};
    use serde_json::json;

    #[test]
    fn days_remaining_rounds_up_and_floors_at_zero() {
        let deleted = Utc::now();
        assert_eq!(days_remaining(deleted, deleted), 30);
        assert_eq!(days_remaining(deleted, deleted + Duration::hours(1)), 30);
        assert_eq!(days_remaining(deleted, deleted + Duration::days(1)), 29);
        assert_eq!(
            days_remaining(deleted, deleted + Duration::days(29) + Duration::hours(23)),
            1
        );
        assert_eq!(days_remaining(deleted, deleted + Duration::days(30)), 0);
        assert_eq!(days_remaining(deleted, deleted + Duration::days(45)), 0);
    }

    #[test]
    fn listing_merges_kinds_newest_first() {
        let h = Harness::new();
        let alice = user("alice");
        let campaign = h
            .engine
            .create_content(&alice, ContentKind::Campaign, "Saltmarsh", &json!({}))
            .unwrap()
            .id;
        let character = h
            .engine
            .create_content(&alice, ContentKind::Character, "Brindle", &json!({}))
            .unwrap()
            .id;
        let oneshot = h
            .engine
            .create_content(&alice, ContentKind::Oneshot, "Sunless Citadel", &json!({}))
            .unwrap()
            .id;

        h.engine.soft_delete(&alice, ContentKind::Character, character).unwrap();
        h.advance(Duration::days(2));
        h.engine.soft_delete(&alice, ContentKind::Oneshot, oneshot).unwrap();
        h.advance(Duration::days(3));
        h.engine.soft_delete(&alice, ContentKind::Campaign, campaign).unwrap();

        let bin = h.engine.list_deleted(&alice).unwrap();
        let order: Vec<_> = bin.iter().map(|e| (e.kind, e.days_remaining)).collect();
        assert_eq!(
            order,
            vec![
                (ContentKind::Campaign, 30),
                (ContentKind::Oneshot, 27),
                (ContentKind::Character, 25),
            ]
        );

        // Another user's bin is empty
        assert!(h.engine.list_deleted(&user("bob")).unwrap().is_empty());
    }

    #[test]
    fn restore_brings_back_inactive_state() {
        let h = Harness::new();
        let alice = user("alice");
        let id = h
            .engine
            .create_content(&alice, ContentKind::Character, "Brindle", &json!({}))
            .unwrap()
            .id;
        h.engine
            .set_inactive(&alice, ContentKind::Character, id, tome_types::InactiveReason::Deceased)
            .unwrap();
        h.engine.soft_delete(&alice, ContentKind::Character, id).unwrap();

        h.engine.restore(&alice, ContentKind::Character, id).unwrap();
        let row = h.engine.get_content(&alice, ContentKind::Character, id).unwrap();
        assert_eq!(row.inactive_reason, Some(tome_types::InactiveReason::Deceased));

        // Second restore has nothing to restore
        let err = h.engine.restore(&alice, ContentKind::Character, id).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn purge_requires_owned_deleted_item() {
        let h = Harness::new();
        let alice = user("alice");
        let bob = user("bob");
        let id = h
            .engine
            .create_content(&alice, ContentKind::Oneshot, "Sunless Citadel", &json!({}))
            .unwrap()
            .id;

        // Live rows are not purgeable
        let err = h.engine.purge(&alice, ContentKind::Oneshot, id).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        h.engine.soft_delete(&alice, ContentKind::Oneshot, id).unwrap();
        let err = h.engine.purge(&bob, ContentKind::Oneshot, id).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        h.engine.purge(&alice, ContentKind::Oneshot, id).unwrap();
        assert!(h.engine.list_deleted(&alice).unwrap().is_empty());
        let err = h.engine.restore(&alice, ContentKind::Oneshot, id).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn empty_all_reports_counts_per_kind() {
        let h = Harness::new();
        let alice = user("alice");
        for name in ["One", "Two"] {
            let id = h
                .engine
                .create_content(&alice, ContentKind::Campaign, name, &json!({}))
                .unwrap()
                .id;
            h.engine.soft_delete(&alice, ContentKind::Campaign, id).unwrap();
        }
        let kept = h
            .engine
            .create_content(&alice, ContentKind::Campaign, "Live", &json!({}))
            .unwrap()
            .id;

        let report = h.engine.empty_all(&alice);
        assert_eq!(report.status(), PurgeStatus::Complete);
        assert_eq!(report.total_purged(), 2);
        assert!(report.purged.contains(&(ContentKind::Campaign, 2)));
        assert!(report.purged.contains(&(ContentKind::Character, 0)));

        // Live content is untouched
        h.engine.get_content(&alice, ContentKind::Campaign, kept).unwrap();
    }

    #[test]
    fn sweep_only_takes_expired_rows() {
        let h = Harness::new();
        let alice = user("alice");
        let bob = user("bob");
        let old = h
            .engine
            .create_content(&alice, ContentKind::Campaign, "Old", &json!({}))
            .unwrap()
            .id;
        h.engine.soft_delete(&alice, ContentKind::Campaign, old).unwrap();

        h.advance(Duration::days(10));
        let recent = h
            .engine
            .create_content(&bob, ContentKind::Character, "Recent", &json!({}))
            .unwrap()
            .id;
        h.engine.soft_delete(&bob, ContentKind::Character, recent).unwrap();

        h.advance(Duration::days(20));
        let report = h.engine.purge_expired(h.now());
        assert_eq!(report.status(), PurgeStatus::Complete);
        assert_eq!(report.total_purged(), 1);

        assert!(h.engine.list_deleted(&alice).unwrap().is_empty());
        let bob_bin = h.engine.list_deleted(&bob).unwrap();
        assert_eq!(bob_bin.len(), 1);
        assert_eq!(bob_bin[0].days_remaining, 10);
    }

    #[test]
    fn report_status_from_outcomes() {
        let mut report = PurgeReport::default();
        assert_eq!(report.status(), PurgeStatus::Complete);

        report.failed.push((ContentKind::Campaign, "boom".into()));
        assert_eq!(report.status(), PurgeStatus::Failed);

        report.purged.push((ContentKind::Character, 0));
        assert_eq!(report.status(), PurgeStatus::Partial);
    }
}
