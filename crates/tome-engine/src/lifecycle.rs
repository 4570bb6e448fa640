use rusqlite::Connection;
use tome_db::models::{ContentRow, NewContent};
use tome_db::queries::content;
use tome_types::{ContentKind, ContentMode, InactiveReason};
use tracing::info;
use uuid::Uuid;

use crate::{Caller, Engine, EngineError, Result};

/// Load a live row the caller owns. Missing and soft-deleted rows are
/// `NotFound`; rows owned by someone else are `Unauthorized`.
pub(crate) fn load_owned_live(
    conn: &Connection,
    caller: &Caller,
    kind: ContentKind,
    id: Uuid,
) -> Result<ContentRow> {
    let row = content::get(conn, kind, id)?
        .filter(|row| !row.is_deleted())
        .ok_or(EngineError::NotFound("Content"))?;

    if row.user_id != caller.user_id {
        return Err(EngineError::Unauthorized);
    }
    Ok(row)
}

impl Engine {
    pub fn create_content(
        &self,
        caller: &Caller,
        kind: ContentKind,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<ContentRow> {
        let id = Uuid::new_v4();
        let now = self.now();

        let row = self.db.with_tx(|tx| -> Result<ContentRow> {
            content::insert(
                tx,
                &NewContent {
                    id,
                    kind,
                    user_id: caller.user_id,
                    name: name.trim(),
                    data,
                    template_source_id: None,
                    saved_template_version: None,
                    created_at: now,
                },
            )?;
            content::get(tx, kind, id)?.ok_or(EngineError::NotFound("Content"))
        })?;

        info!(%kind, %id, owner = %caller.user_id, "Content created");
        Ok(row)
    }

    pub fn get_content(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<ContentRow> {
        let row = self.db.with_conn(|conn| content::get(conn, kind, id))?;
        match row {
            Some(row) if row.is_deleted() => Err(EngineError::NotFound("Content")),
            Some(row) if row.user_id != caller.user_id => Err(EngineError::Unauthorized),
            Some(row) => Ok(row),
            None => Err(EngineError::NotFound("Content")),
        }
    }

    /// Move content to inactive with a reason valid for its kind. Already
    /// inactive content just takes the new reason.
    pub fn set_inactive(
        &self,
        caller: &Caller,
        kind: ContentKind,
        id: Uuid,
        reason: InactiveReason,
    ) -> Result<ContentRow> {
        if !kind.allows_reason(reason) {
            return Err(EngineError::InvalidReason {
                kind,
                reason: reason.to_string(),
            });
        }

        let row = self.db.with_tx(|tx| -> Result<ContentRow> {
            load_owned_live(tx, caller, kind, id)?;
            content::set_inactive(tx, kind, id, reason)?;
            content::get(tx, kind, id)?.ok_or(EngineError::NotFound("Content"))
        })?;

        info!(%kind, %id, %reason, "Content set inactive");
        Ok(row)
    }

    /// Parse a reason from its wire form, then [`Engine::set_inactive`].
    pub fn set_inactive_str(
        &self,
        caller: &Caller,
        kind: ContentKind,
        id: Uuid,
        reason: &str,
    ) -> Result<ContentRow> {
        let parsed = reason
            .parse::<InactiveReason>()
            .map_err(|_| EngineError::InvalidReason {
                kind,
                reason: reason.to_string(),
            })?;
        self.set_inactive(caller, kind, id, parsed)
    }

    pub fn reactivate(&self, caller: &Caller, kind: ContentKind, id: Uuid) -> Result<ContentRow> {
        let row = self.db.with_tx(|tx| -> Result<ContentRow> {
            let current = load_owned_live(tx, caller, kind, id)?;
            if content::reactivate(tx, kind, id)? == 0 {
                return Err(EngineError::NotInTargetState {
                    expected: ContentMode::Inactive,
                    actual: current.content_mode,
                });
            }
            content::get(tx, kind, id)?.ok_or(EngineError::NotFound("Content"))
        })?;

        info!(%kind, %id, "Content reactivated");
        Ok(row)
    }
}
