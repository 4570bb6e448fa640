use anyhow::Result;
use rusqlite::{Connection, Row, params};
use tome_types::ContentKind;
use uuid::Uuid;

use super::{OptionalExt, parse_col};
use crate::models::{NewSnapshot, SnapshotRow};

const COLUMNS: &str = "id, user_id, content_type, content_id, version, version_name, \
     version_notes, snapshot_data, is_public, allow_save, attribution_name, save_count, published_at";

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content_type: parse_col::<ContentKind>(row, 2)?,
        content_id: row.get(3)?,
        version: row.get(4)?,
        version_name: row.get(5)?,
        version_notes: row.get(6)?,
        snapshot_data: row.get(7)?,
        is_public: row.get(8)?,
        allow_save: row.get(9)?,
        attribution_name: row.get(10)?,
        save_count: row.get(11)?,
        published_at: row.get(12)?,
    })
}

/// Hand out the next version number for a content item. The counter row is
/// never removed by unpublish, so numbers keep climbing across republishes.
pub fn next_version(conn: &Connection, kind: ContentKind, content_id: Uuid) -> Result<u32> {
    let version = conn.query_row(
        "INSERT INTO template_version_counters (content_type, content_id, last_version)
         VALUES (?1, ?2, 1)
         ON CONFLICT (content_type, content_id)
         DO UPDATE SET last_version = last_version + 1
         RETURNING last_version",
        params![kind.as_str(), content_id],
        |row| row.get(0),
    )?;
    Ok(version)
}

pub fn delete_counter(conn: &Connection, kind: ContentKind, content_id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM template_version_counters WHERE content_type = ?1 AND content_id = ?2",
        params![kind.as_str(), content_id],
    )?;
    Ok(n)
}

pub fn insert(conn: &Connection, new: &NewSnapshot<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO template_snapshots
         (id, user_id, content_type, content_id, version, version_name, version_notes,
          snapshot_data, is_public, allow_save, attribution_name, save_count, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, 0, ?11)",
        params![
            new.id,
            new.user_id,
            new.content_type.as_str(),
            new.content_id,
            new.version,
            new.version_name,
            new.version_notes,
            new.snapshot_data,
            new.is_public,
            new.attribution_name,
            new.published_at,
        ],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<SnapshotRow>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM template_snapshots WHERE id = ?1"),
        [id],
        snapshot_from_row,
    )
    .optional()
}

/// All snapshots of one content item, newest version first.
pub fn list_for_content(
    conn: &Connection,
    kind: ContentKind,
    content_id: Uuid,
) -> Result<Vec<SnapshotRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM template_snapshots
         WHERE content_type = ?1 AND content_id = ?2
         ORDER BY version DESC"
    ))?;

    let rows = stmt
        .query_map(params![kind.as_str(), content_id], snapshot_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Visibility and saveability move together; attribution only when public.
pub fn set_visibility(
    conn: &Connection,
    id: Uuid,
    is_public: bool,
    attribution_name: Option<&str>,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE template_snapshots
         SET is_public = ?2, allow_save = ?2, attribution_name = ?3
         WHERE id = ?1",
        params![id, is_public, attribution_name],
    )?;
    Ok(n)
}

pub fn increment_save_count(conn: &Connection, id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "UPDATE template_snapshots SET save_count = save_count + 1 WHERE id = ?1",
        [id],
    )?;
    Ok(n)
}

/// Drop superseded versions nobody saved and nobody points at.
pub fn prune_unsaved_before(
    conn: &Connection,
    kind: ContentKind,
    content_id: Uuid,
    version: u32,
) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM template_snapshots
         WHERE content_type = ?1 AND content_id = ?2 AND version < ?3
           AND save_count = 0
           AND NOT EXISTS (SELECT 1 FROM content_saves s WHERE s.snapshot_id = template_snapshots.id)",
        params![kind.as_str(), content_id, version],
    )?;
    Ok(n)
}

/// Remove every snapshot of an item that no save depends on.
pub fn delete_unreferenced(conn: &Connection, kind: ContentKind, content_id: Uuid) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM template_snapshots
         WHERE content_type = ?1 AND content_id = ?2
           AND save_count = 0
           AND NOT EXISTS (SELECT 1 FROM content_saves s WHERE s.snapshot_id = template_snapshots.id)",
        params![kind.as_str(), content_id],
    )?;
    Ok(n)
}
