use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tome_types::ContentKind;
use uuid::Uuid;

use super::{OptionalExt, parse_col};
use crate::models::{NewSave, SaveRow};

const COLUMNS: &str = "id, user_id, snapshot_id, source_type, source_name, source_owner_id, \
     saved_version, latest_available_version, update_available, instance_id, saved_at, started_playing_at";

fn save_from_row(row: &Row<'_>) -> rusqlite::Result<SaveRow> {
    Ok(SaveRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        snapshot_id: row.get(2)?,
        source_type: parse_col::<ContentKind>(row, 3)?,
        source_name: row.get(4)?,
        source_owner_id: row.get(5)?,
        saved_version: row.get(6)?,
        latest_available_version: row.get(7)?,
        update_available: row.get(8)?,
        instance_id: row.get(9)?,
        saved_at: row.get(10)?,
        started_playing_at: row.get(11)?,
    })
}

pub fn insert(conn: &Connection, new: &NewSave<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO content_saves
         (id, user_id, snapshot_id, source_type, source_name, source_owner_id,
          saved_version, latest_available_version, update_available, saved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 0, ?8)",
        params![
            new.id,
            new.user_id,
            new.snapshot_id,
            new.source_type.as_str(),
            new.source_name,
            new.source_owner_id,
            new.version,
            new.saved_at,
        ],
    )?;
    Ok(())
}

/// A save, but only if it belongs to `user_id`.
pub fn get_owned(conn: &Connection, id: Uuid, user_id: Uuid) -> Result<Option<SaveRow>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM content_saves WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        save_from_row,
    )
    .optional()
}

pub fn exists_for(conn: &Connection, user_id: Uuid, snapshot_id: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM content_saves WHERE user_id = ?1 AND snapshot_id = ?2",
            params![user_id, snapshot_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn list_for_user(conn: &Connection, user_id: Uuid) -> Result<Vec<SaveRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM content_saves WHERE user_id = ?1 ORDER BY saved_at DESC"
    ))?;

    let rows = stmt
        .query_map([user_id], save_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Saves pointing at any snapshot of the given content item.
pub fn list_for_content(
    conn: &Connection,
    kind: ContentKind,
    content_id: Uuid,
) -> Result<Vec<SaveRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM content_saves
         WHERE snapshot_id IN (
             SELECT id FROM template_snapshots WHERE content_type = ?1 AND content_id = ?2
         )
         ORDER BY saved_at DESC"
    ))?;

    let rows = stmt
        .query_map(params![kind.as_str(), content_id], save_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Point a save at another snapshot and mark it current.
pub fn repoint(conn: &Connection, id: Uuid, snapshot_id: Uuid, version: u32) -> Result<usize> {
    let n = conn.execute(
        "UPDATE content_saves
         SET snapshot_id = ?2, saved_version = ?3, latest_available_version = ?3, update_available = 0
         WHERE id = ?1",
        params![id, snapshot_id, version],
    )?;
    Ok(n)
}

/// Tell every saver of a content item that `version` now exists.
pub fn announce_version(
    conn: &Connection,
    kind: ContentKind,
    content_id: Uuid,
    version: u32,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE content_saves
         SET latest_available_version = MAX(latest_available_version, ?3),
             update_available = (MAX(latest_available_version, ?3) > saved_version)
         WHERE snapshot_id IN (
             SELECT id FROM template_snapshots WHERE content_type = ?1 AND content_id = ?2
         )",
        params![kind.as_str(), content_id, version],
    )?;
    Ok(n)
}

/// Recompute `latest_available_version` and `update_available` for a user's
/// saves from the snapshots that exist right now.
pub fn refresh_for_user(conn: &Connection, user_id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "UPDATE content_saves
         SET latest_available_version = COALESCE((
             SELECT MAX(other.version)
             FROM template_snapshots cur
             JOIN template_snapshots other
               ON other.content_type = cur.content_type AND other.content_id = cur.content_id
             WHERE cur.id = content_saves.snapshot_id
         ), latest_available_version)
         WHERE user_id = ?1",
        [user_id],
    )?;
    conn.execute(
        "UPDATE content_saves
         SET update_available = (latest_available_version > saved_version)
         WHERE user_id = ?1",
        [user_id],
    )?;
    Ok(n)
}

pub fn mark_started(
    conn: &Connection,
    id: Uuid,
    instance_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE content_saves SET instance_id = ?2, started_playing_at = ?3
         WHERE id = ?1 AND instance_id IS NULL",
        params![id, instance_id, now],
    )?;
    Ok(n)
}

pub fn delete_owned(conn: &Connection, id: Uuid, user_id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM content_saves WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::models::NewSnapshot;
    use crate::queries::snapshots;

    fn snapshot(conn: &Connection, content_id: Uuid, owner: Uuid) -> (Uuid, u32) {
        let version = snapshots::next_version(conn, ContentKind::Oneshot, content_id).unwrap();
        let id = Uuid::new_v4();
        let data = serde_json::json!({ "name": "Death House" });
        snapshots::insert(
            conn,
            &NewSnapshot {
                id,
                user_id: owner,
                content_type: ContentKind::Oneshot,
                content_id,
                version,
                version_name: None,
                version_notes: None,
                snapshot_data: &data,
                is_public: true,
                attribution_name: Some("dm_sarah"),
                published_at: Utc::now(),
            },
        )
        .unwrap();
        (id, version)
    }

    fn save(conn: &Connection, user: Uuid, snapshot_id: Uuid, owner: Uuid, version: u32) -> Uuid {
        let id = Uuid::new_v4();
        insert(
            conn,
            &NewSave {
                id,
                user_id: user,
                snapshot_id,
                source_type: ContentKind::Oneshot,
                source_name: "Death House",
                source_owner_id: owner,
                version,
                saved_at: Utc::now(),
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn announce_and_refresh_track_the_newest_version() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let player = Uuid::new_v4();
        let content = Uuid::new_v4();

        db.with_conn_mut(|conn| {
            let (v1, n1) = snapshot(conn, content, owner);
            let save_id = save(conn, player, v1, owner, n1);

            let (_v2, n2) = snapshot(conn, content, owner);
            assert_eq!(announce_version(conn, ContentKind::Oneshot, content, n2)?, 1);
            let row = get_owned(conn, save_id, player)?.unwrap();
            assert_eq!(row.latest_available_version, 2);
            assert!(row.update_available);

            // An older announcement never moves the marker back
            announce_version(conn, ContentKind::Oneshot, content, 1)?;
            let row = get_owned(conn, save_id, player)?.unwrap();
            assert_eq!(row.latest_available_version, 2);

            refresh_for_user(conn, player)?;
            let row = get_owned(conn, save_id, player)?.unwrap();
            assert_eq!(row.latest_available_version, 2);
            assert!(row.update_available);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn saves_are_scoped_to_their_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let player = Uuid::new_v4();

        db.with_conn_mut(|conn| {
            let (snap, version) = snapshot(conn, Uuid::new_v4(), owner);
            let save_id = save(conn, player, snap, owner, version);

            assert!(exists_for(conn, player, snap)?);
            assert!(get_owned(conn, save_id, owner)?.is_none());
            assert_eq!(delete_owned(conn, save_id, owner)?, 0);

            let started = Uuid::new_v4();
            assert_eq!(mark_started(conn, save_id, started, Utc::now())?, 1);
            assert_eq!(mark_started(conn, save_id, Uuid::new_v4(), Utc::now())?, 0);
            let row = get_owned(conn, save_id, player)?.unwrap();
            assert_eq!(row.instance_id, Some(started));

            assert_eq!(delete_owned(conn, save_id, player)?, 1);
            assert!(list_for_user(conn, player)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn one_save_per_user_and_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let player = Uuid::new_v4();

        let result = db.with_conn_mut(|conn| {
            let (snap, version) = snapshot(conn, Uuid::new_v4(), owner);
            save(conn, player, snap, owner, version);
            insert(
                conn,
                &NewSave {
                    id: Uuid::new_v4(),
                    user_id: player,
                    snapshot_id: snap,
                    source_type: ContentKind::Oneshot,
                    source_name: "Death House",
                    source_owner_id: owner,
                    version,
                    saved_at: Utc::now(),
                },
            )
        });
        assert!(result.is_err());
    }
}
