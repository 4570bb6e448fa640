//! Saves: one user's reference to another user's published snapshot.

use tome_db::models::{ContentRow, NewContent, NewSave, SaveRow};
use tome_db::queries::{content, saves, snapshots};
use tracing::info;
use uuid::Uuid;

use crate::{Caller, Engine, EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub new_version: u32,
}

impl Engine {
    /// Save someone else's snapshot to the caller's collection.
    pub fn create_save(&self, caller: &Caller, snapshot_id: Uuid) -> Result<SaveRow> {
        let now = self.now();

        let save = self.db.with_tx(|tx| -> Result<SaveRow> {
            let snapshot = snapshots::get(tx, snapshot_id)?.ok_or(EngineError::NotFound("Template"))?;
            if !snapshot.allow_save {
                return Err(EngineError::SaveNotAllowed);
            }
            if snapshot.user_id == caller.user_id {
                return Err(EngineError::OwnTemplate);
            }
            if saves::exists_for(tx, caller.user_id, snapshot_id)? {
                return Err(EngineError::AlreadySaved);
            }

            let id = Uuid::new_v4();
            saves::insert(
                tx,
                &NewSave {
                    id,
                    user_id: caller.user_id,
                    snapshot_id,
                    source_type: snapshot.content_type,
                    source_name: snapshot.source_name(),
                    source_owner_id: snapshot.user_id,
                    version: snapshot.version,
                    saved_at: now,
                },
            )?;
            snapshots::increment_save_count(tx, snapshot_id)?;

            saves::get_owned(tx, id, caller.user_id)?.ok_or(EngineError::NotFound("Save"))
        })?;

        info!(save_id = %save.id, %snapshot_id, version = save.saved_version, "Template saved");
        Ok(save)
    }

    /// Move a save onto another version of the same content.
    pub fn update_saved(
        &self,
        caller: &Caller,
        save_id: Uuid,
        new_snapshot_id: Uuid,
    ) -> Result<UpdateOutcome> {
        let outcome = self.db.with_tx(|tx| -> Result<UpdateOutcome> {
            let save = saves::get_owned(tx, save_id, caller.user_id)?.ok_or(EngineError::NotFound("Save"))?;
            let current = snapshots::get(tx, save.snapshot_id)?.ok_or(EngineError::NotFound("Snapshot"))?;
            let target = snapshots::get(tx, new_snapshot_id)?.ok_or(EngineError::NotFound("Snapshot"))?;

            if (target.content_type, target.content_id) != (current.content_type, current.content_id) {
                return Err(EngineError::ContentMismatch);
            }
            if target.id != current.id {
                if !target.allow_save {
                    return Err(EngineError::SaveNotAllowed);
                }
                if saves::exists_for(tx, caller.user_id, target.id)? {
                    return Err(EngineError::AlreadySaved);
                }
            }

            saves::repoint(tx, save_id, target.id, target.version)?;
            Ok(UpdateOutcome {
                new_version: target.version,
            })
        })?;

        info!(%save_id, new_version = outcome.new_version, "Save updated");
        Ok(outcome)
    }

    /// The caller's saves, newest first, with update availability recomputed
    /// against the snapshots that exist now.
    pub fn list_saves(&self, caller: &Caller) -> Result<Vec<SaveRow>> {
        let rows = self.db.with_tx(|tx| -> Result<Vec<SaveRow>> {
            saves::refresh_for_user(tx, caller.user_id)?;
            Ok(saves::list_for_user(tx, caller.user_id)?)
        })?;
        Ok(rows)
    }

    /// Drop a save. The snapshot's save count is a historical tally and is
    /// left as is.
    pub fn remove_save(&self, caller: &Caller, save_id: Uuid) -> Result<()> {
        let removed = self
            .db
            .with_conn_mut(|conn| saves::delete_owned(conn, save_id, caller.user_id))?;
        if removed == 0 {
            return Err(EngineError::NotFound("Save"));
        }

        info!(%save_id, "Save removed");
        Ok(())
    }

    /// Copy the saved snapshot into a new content row the caller owns and
    /// link it to the save. A save can only be started once.
    pub fn start_playing(
        &self,
        caller: &Caller,
        save_id: Uuid,
        custom_name: Option<&str>,
    ) -> Result<ContentRow> {
        let now = self.now();

        let row = self.db.with_tx(|tx| -> Result<ContentRow> {
            let save = saves::get_owned(tx, save_id, caller.user_id)?.ok_or(EngineError::NotFound("Save"))?;
            if let Some(instance_id) = save.instance_id {
                return Err(EngineError::AlreadyStarted { instance_id });
            }
            let snapshot = snapshots::get(tx, save.snapshot_id)?.ok_or(EngineError::NotFound("Snapshot"))?;

            let name = custom_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| snapshot.source_name());
            let data = snapshot
                .snapshot_data
                .get("data")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));

            let instance_id = Uuid::new_v4();
            content::insert(
                tx,
                &NewContent {
                    id: instance_id,
                    kind: snapshot.content_type,
                    user_id: caller.user_id,
                    name,
                    data: &data,
                    template_source_id: Some(snapshot.content_id),
                    saved_template_version: Some(snapshot.version),
                    created_at: now,
                },
            )?;
            saves::mark_started(tx, save_id, instance_id, now)?;

            content::get(tx, snapshot.content_type, instance_id)?.ok_or(EngineError::NotFound("Content"))
        })?;

        info!(%save_id, instance_id = %row.id, kind = %row.kind, "Started playing saved template");
        Ok(row)
    }
}
