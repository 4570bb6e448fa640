//! Publishing content as versioned, immutable template snapshots.

use chrono::{DateTime, Utc};
use serde_json::json;
use tome_db::models::{NewSnapshot, SnapshotRow};
use tome_db::queries::{content, saves, snapshots};
use tome_types::ContentKind;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::VersionSaves;
use crate::lifecycle::load_owned_live;
use crate::{Caller, Engine, EngineError, Result};

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub is_public: bool,
    pub version_name: Option<String>,
    pub version_notes: Option<String>,
}

impl PublishOptions {
    pub fn public() -> Self {
        Self {
            is_public: true,
            ..Self::default()
        }
    }

    pub fn private() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.version_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub snapshot_id: Uuid,
    pub version: u32,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpublishOutcome {
    pub removed_snapshots: usize,
}

#[derive(Debug, Clone)]
pub struct VersionListing {
    pub is_owner: bool,
    /// Newest version first.
    pub versions: Vec<SnapshotRow>,
}

#[derive(Debug, Clone)]
pub struct TemplateStats {
    /// Every save ever made, across versions. Removed saves still count.
    pub total_saves: i64,
    pub total_started: usize,
    pub versions: Vec<SnapshotRow>,
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Public snapshots carry the owner's username; private ones carry none.
fn public_attribution(caller: &Caller, is_public: bool) -> Result<Option<&str>> {
    if !is_public {
        return Ok(None);
    }
    caller
        .stable_username()
        .map(Some)
        .ok_or(EngineError::UsernameRequired)
}

impl Engine {
    /// Freeze the current content into a new snapshot with the next version
    /// number. Older versions nobody saved are pruned; savers of earlier
    /// versions are told an update exists.
    pub fn publish(
        &self,
        caller: &Caller,
        kind: ContentKind,
        id: Uuid,
        options: &PublishOptions,
    ) -> Result<PublishOutcome> {
        let now = self.now();

        let outcome = self.db.with_tx(|tx| -> Result<PublishOutcome> {
            let row = load_owned_live(tx, caller, kind, id)?;
            let attribution = public_attribution(caller, options.is_public)?;
            let version = snapshots::next_version(tx, kind, id)?;
            let snapshot_id = Uuid::new_v4();
            let data = json!({ "name": row.name, "data": row.data });

            snapshots::insert(
                tx,
                &NewSnapshot {
                    id: snapshot_id,
                    user_id: caller.user_id,
                    content_type: kind,
                    content_id: id,
                    version,
                    version_name: trimmed(&options.version_name),
                    version_notes: trimmed(&options.version_notes),
                    snapshot_data: &data,
                    is_public: options.is_public,
                    attribution_name: attribution,
                    published_at: now,
                },
            )?;
            content::mark_published(tx, kind, id, version, options.is_public, now)?;

            let pruned = snapshots::prune_unsaved_before(tx, kind, id, version)?;
            let notified = saves::announce_version(tx, kind, id, version)?;
            debug!(%kind, %id, pruned, notified, "Publish housekeeping");

            Ok(PublishOutcome {
                snapshot_id,
                version,
                published_at: now,
            })
        })?;

        info!(
            %kind,
            %id,
            version = outcome.version,
            public = options.is_public,
            "Template published"
        );
        Ok(outcome)
    }

    /// Flip a snapshot's visibility. Saveability follows visibility, and
    /// attribution is only recorded while public.
    pub fn toggle_visibility(
        &self,
        caller: &Caller,
        snapshot_id: Uuid,
        is_public: bool,
    ) -> Result<SnapshotRow> {
        let snapshot = self.db.with_tx(|tx| -> Result<SnapshotRow> {
            let snapshot = snapshots::get(tx, snapshot_id)?.ok_or(EngineError::NotFound("Snapshot"))?;
            if snapshot.user_id != caller.user_id {
                return Err(EngineError::Unauthorized);
            }
            let attribution = public_attribution(caller, is_public)?;
            snapshots::set_visibility(tx, snapshot_id, is_public, attribution)?;

            // The content row mirrors its newest version
            let newest = snapshots::list_for_content(tx, snapshot.content_type, snapshot.content_id)?
                .first()
                .map(|s| s.id);
            if newest == Some(snapshot_id) {
                content::set_allow_save(tx, snapshot.content_type, snapshot.content_id, is_public)?;
            }

            snapshots::get(tx, snapshot_id)?.ok_or(EngineError::NotFound("Snapshot"))
        })?;

        info!(%snapshot_id, is_public, "Snapshot visibility changed");
        Ok(snapshot)
    }

    /// Withdraw every version of a template. Refused while any version is
    /// held by a save.
    pub fn unpublish(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<UnpublishOutcome> {
        let outcome = self.db.with_tx(|tx| -> Result<UnpublishOutcome> {
            let row = load_owned_live(tx, caller, kind, id)?;
            if !row.is_published() {
                return Ok(UnpublishOutcome { removed_snapshots: 0 });
            }

            let versions = snapshots::list_for_content(tx, kind, id)?;
            let held: Vec<VersionSaves> = versions
                .iter()
                .filter(|s| s.save_count > 0)
                .map(|s| VersionSaves {
                    version: s.version,
                    saves: s.save_count,
                })
                .collect();
            if !held.is_empty() {
                return Err(EngineError::TemplateHasDependents {
                    save_count: held.iter().map(|v| v.saves).sum(),
                    versions: held,
                });
            }

            let removed_snapshots = snapshots::delete_unreferenced(tx, kind, id)?;
            content::reset_template_fields(tx, kind, id)?;
            Ok(UnpublishOutcome { removed_snapshots })
        })?;

        info!(%kind, %id, removed = outcome.removed_snapshots, "Template unpublished");
        Ok(outcome)
    }

    /// Version history of a content item. Works for anyone who knows the id;
    /// `is_owner` tells the caller whether they may manage it.
    pub fn list_versions(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<VersionListing> {
        let (row, versions) = self.db.with_conn(|conn| {
            Ok((
                content::get(conn, kind, id)?,
                snapshots::list_for_content(conn, kind, id)?,
            ))
        })?;

        let owner = match (&row, versions.first()) {
            (Some(row), _) => row.user_id,
            (None, Some(snapshot)) => snapshot.user_id,
            (None, None) => return Err(EngineError::NotFound("Content")),
        };

        Ok(VersionListing {
            is_owner: owner == caller.user_id,
            versions,
        })
    }

    /// Save and play counts across every version. Owner only.
    pub fn template_stats(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<TemplateStats> {
        let (row, versions, current) = self.db.with_conn(|conn| {
            Ok((
                content::get(conn, kind, id)?,
                snapshots::list_for_content(conn, kind, id)?,
                saves::list_for_content(conn, kind, id)?,
            ))
        })?;

        let row = row.ok_or(EngineError::NotFound("Content"))?;
        if row.user_id != caller.user_id {
            return Err(EngineError::Unauthorized);
        }

        Ok(TemplateStats {
            total_saves: versions.iter().map(|s| s.save_count).sum(),
            total_started: current.iter().filter(|s| s.instance_id.is_some()).count(),
            versions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, anonymous, user};
    use tome_types::{ContentMode, InactiveReason};

    fn campaign(h: &Harness, owner: &Caller) -> Uuid {
        h.engine
            .create_content(owner, ContentKind::Campaign, "Saltmarsh", &serde_json::json!({"acts": 3}))
            .unwrap()
            .id
    }

    #[test]
    fn publish_snapshots_content_and_marks_row() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);

        let out = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public().named("  Launch "))
            .unwrap();
        assert_eq!(out.version, 1);

        let row = h.engine.get_content(&alice, ContentKind::Campaign, id).unwrap();
        assert_eq!(row.template_version, 1);
        assert!(row.is_session0_ready);
        assert!(row.allow_save);
        assert_eq!(row.published_at, Some(out.published_at));

        let listing = h.engine.list_versions(&alice, ContentKind::Campaign, id).unwrap();
        assert!(listing.is_owner);
        let snap = &listing.versions[0];
        assert_eq!(snap.version_name.as_deref(), Some("Launch"));
        assert_eq!(snap.attribution_name.as_deref(), Some("alice"));
        assert_eq!(snap.source_name(), "Saltmarsh");
        assert_eq!(snap.snapshot_data["data"]["acts"], 3);
        assert_eq!(snap.save_count, 0);
    }

    #[test]
    fn public_publish_needs_a_username() {
        let h = Harness::new();
        let nobody = anonymous();
        let id = campaign(&h, &nobody);

        let err = h
            .engine
            .publish(&nobody, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap_err();
        assert!(matches!(err, EngineError::UsernameRequired));

        // Private publishing does not
        let out = h
            .engine
            .publish(&nobody, ContentKind::Campaign, id, &PublishOptions::private())
            .unwrap();
        assert_eq!(out.version, 1);
        let listing = h.engine.list_versions(&nobody, ContentKind::Campaign, id).unwrap();
        assert!(!listing.versions[0].is_public);
        assert!(!listing.versions[0].allow_save);
        assert_eq!(listing.versions[0].attribution_name, None);
    }

    #[test]
    fn republish_prunes_unsaved_versions_and_keeps_first_publish_time() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);

        let first = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();
        h.advance(chrono::Duration::hours(1));
        let second = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();
        assert_eq!(second.version, 2);

        let listing = h.engine.list_versions(&alice, ContentKind::Campaign, id).unwrap();
        let versions: Vec<u32> = listing.versions.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![2]);

        let row = h.engine.get_content(&alice, ContentKind::Campaign, id).unwrap();
        assert_eq!(row.template_version, 2);
        assert_eq!(row.published_at, Some(first.published_at));
    }

    #[test]
    fn publish_works_from_inactive_but_not_deleted() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);
        h.engine
            .set_inactive(&alice, ContentKind::Campaign, id, InactiveReason::Completed)
            .unwrap();
        h.engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();

        h.engine.soft_delete(&alice, ContentKind::Campaign, id).unwrap();
        let err = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn only_owner_publishes() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);

        let err = h
            .engine
            .publish(&user("mallory"), ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
    }

    #[test]
    fn visibility_toggle_follows_newest_version_onto_content() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);
        let out = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();

        let snap = h.engine.toggle_visibility(&alice, out.snapshot_id, false).unwrap();
        assert!(!snap.is_public);
        assert!(!snap.allow_save);
        assert_eq!(snap.attribution_name, None);
        let row = h.engine.get_content(&alice, ContentKind::Campaign, id).unwrap();
        assert!(!row.allow_save);

        let err = h
            .engine
            .toggle_visibility(&user("mallory"), out.snapshot_id, true)
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));

        let err = h
            .engine
            .toggle_visibility(&alice, Uuid::new_v4(), true)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn making_a_snapshot_public_needs_a_username() {
        let h = Harness::new();
        let blank = Caller::new(Uuid::new_v4(), Some("   ".to_string()));

        for owner in [anonymous(), blank] {
            let id = campaign(&h, &owner);
            let out = h
                .engine
                .publish(&owner, ContentKind::Campaign, id, &PublishOptions::private())
                .unwrap();

            let err = h
                .engine
                .toggle_visibility(&owner, out.snapshot_id, true)
                .unwrap_err();
            assert!(matches!(err, EngineError::UsernameRequired));

            let listing = h.engine.list_versions(&owner, ContentKind::Campaign, id).unwrap();
            let snap = &listing.versions[0];
            assert!(!snap.is_public);
            assert!(!snap.allow_save);
            assert_eq!(snap.attribution_name, None);

            // Going private needs no username
            h.engine.toggle_visibility(&owner, out.snapshot_id, false).unwrap();
        }
    }

    #[test]
    fn ownership_is_checked_before_the_username() {
        let h = Harness::new();
        let alice = user("alice");
        let nobody = anonymous();
        let id = campaign(&h, &alice);
        let out = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();

        let err = h
            .engine
            .publish(&nobody, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));

        let err = h
            .engine
            .publish(&nobody, ContentKind::Campaign, Uuid::new_v4(), &PublishOptions::public())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = h
            .engine
            .toggle_visibility(&nobody, out.snapshot_id, true)
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));

        let err = h
            .engine
            .toggle_visibility(&nobody, Uuid::new_v4(), true)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn unpublish_resets_template_fields_but_not_version_numbers() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);
        h.engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();
        h.engine
            .set_inactive(&alice, ContentKind::Campaign, id, InactiveReason::OnHiatus)
            .unwrap();

        let out = h.engine.unpublish(&alice, ContentKind::Campaign, id).unwrap();
        assert_eq!(out.removed_snapshots, 1);

        let row = h.engine.get_content(&alice, ContentKind::Campaign, id).unwrap();
        assert_eq!(row.template_version, 1);
        assert_eq!(row.published_at, None);
        assert!(!row.is_session0_ready);
        assert!(!row.allow_save);
        assert_eq!(row.content_mode, ContentMode::Active);
        assert_eq!(row.inactive_reason, None);

        // Publishing again continues the sequence
        let again = h
            .engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();
        assert_eq!(again.version, 2);
    }

    #[test]
    fn unpublishing_never_published_content_is_a_no_op() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);
        h.engine
            .set_inactive(&alice, ContentKind::Campaign, id, InactiveReason::Completed)
            .unwrap();

        let out = h.engine.unpublish(&alice, ContentKind::Campaign, id).unwrap();
        assert_eq!(out.removed_snapshots, 0);

        let row = h.engine.get_content(&alice, ContentKind::Campaign, id).unwrap();
        assert!(!row.is_published());
        assert_eq!(row.content_mode, ContentMode::Inactive);
    }

    #[test]
    fn versions_visible_to_non_owners() {
        let h = Harness::new();
        let alice = user("alice");
        let id = campaign(&h, &alice);
        h.engine
            .publish(&alice, ContentKind::Campaign, id, &PublishOptions::public())
            .unwrap();

        let listing = h.engine.list_versions(&user("bob"), ContentKind::Campaign, id).unwrap();
        assert!(!listing.is_owner);
        assert_eq!(listing.versions.len(), 1);

        let err = h
            .engine
            .list_versions(&alice, ContentKind::Campaign, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = h
            .engine
            .template_stats(&user("bob"), ContentKind::Campaign, id)
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
    }
}
