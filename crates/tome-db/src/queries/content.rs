use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tome_types::{ContentKind, ContentMode, InactiveReason};
use uuid::Uuid;

use super::{OptionalExt, parse_col, parse_opt_col};
use crate::models::{ContentRow, NewContent};

const COLUMNS: &str = "id, user_id, name, data, content_mode, inactive_reason, deleted_at, \
     template_version, published_at, is_session0_ready, allow_save, \
     template_source_id, saved_template_version, created_at";

fn content_from_row(kind: ContentKind, row: &Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok(ContentRow {
        id: row.get(0)?,
        kind,
        user_id: row.get(1)?,
        name: row.get(2)?,
        data: row.get(3)?,
        content_mode: parse_col::<ContentMode>(row, 4)?,
        inactive_reason: parse_opt_col::<InactiveReason>(row, 5)?,
        deleted_at: row.get(6)?,
        template_version: row.get(7)?,
        published_at: row.get(8)?,
        is_session0_ready: row.get(9)?,
        allow_save: row.get(10)?,
        template_source_id: row.get(11)?,
        saved_template_version: row.get(12)?,
        created_at: row.get(13)?,
    })
}

pub fn insert(conn: &Connection, new: &NewContent<'_>) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, user_id, name, data, template_source_id, saved_template_version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            new.kind.table()
        ),
        params![
            new.id,
            new.user_id,
            new.name,
            new.data,
            new.template_source_id,
            new.saved_template_version,
            new.created_at,
        ],
    )?;
    Ok(())
}

/// Fetch a row regardless of owner or deletion state.
pub fn get(conn: &Connection, kind: ContentKind, id: Uuid) -> Result<Option<ContentRow>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM {} WHERE id = ?1", kind.table()),
        [id],
        |row| content_from_row(kind, row),
    )
    .optional()
}

pub fn set_inactive(
    conn: &Connection,
    kind: ContentKind,
    id: Uuid,
    reason: InactiveReason,
) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET content_mode = 'inactive', inactive_reason = ?2
             WHERE id = ?1 AND deleted_at IS NULL",
            kind.table()
        ),
        params![id, reason.as_str()],
    )?;
    Ok(n)
}

/// Only flips rows that are currently inactive; returns 0 otherwise.
pub fn reactivate(conn: &Connection, kind: ContentKind, id: Uuid) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET content_mode = 'active', inactive_reason = NULL
             WHERE id = ?1 AND deleted_at IS NULL AND content_mode = 'inactive'",
            kind.table()
        ),
        [id],
    )?;
    Ok(n)
}

pub fn soft_delete(
    conn: &Connection,
    kind: ContentKind,
    id: Uuid,
    owner: Uuid,
    now: DateTime<Utc>,
) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET deleted_at = ?3
             WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
            kind.table()
        ),
        params![id, owner, now],
    )?;
    Ok(n)
}

pub fn restore(conn: &Connection, kind: ContentKind, id: Uuid, owner: Uuid) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET deleted_at = NULL
             WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NOT NULL",
            kind.table()
        ),
        params![id, owner],
    )?;
    Ok(n)
}

/// Hard delete, only ever of a soft-deleted row.
pub fn delete_deleted(conn: &Connection, kind: ContentKind, id: Uuid) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "DELETE FROM {} WHERE id = ?1 AND deleted_at IS NOT NULL",
            kind.table()
        ),
        [id],
    )?;
    Ok(n)
}

pub fn list_deleted_for_owner(
    conn: &Connection,
    kind: ContentKind,
    owner: Uuid,
) -> Result<Vec<ContentRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM {}
         WHERE user_id = ?1 AND deleted_at IS NOT NULL
         ORDER BY deleted_at DESC",
        kind.table()
    ))?;

    let rows = stmt
        .query_map([owner], |row| content_from_row(kind, row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Every soft-deleted row of a kind, across all owners, as (id, deleted_at).
pub fn list_all_deleted(
    conn: &Connection,
    kind: ContentKind,
) -> Result<Vec<(Uuid, DateTime<Utc>)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, deleted_at FROM {} WHERE deleted_at IS NOT NULL",
        kind.table()
    ))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Record a publish. `published_at` keeps the first publication time.
pub fn mark_published(
    conn: &Connection,
    kind: ContentKind,
    id: Uuid,
    version: u32,
    allow_save: bool,
    now: DateTime<Utc>,
) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET template_version = ?2,
                           published_at = COALESCE(published_at, ?3),
                           is_session0_ready = 1,
                           allow_save = ?4
             WHERE id = ?1",
            kind.table()
        ),
        params![id, version, now, allow_save],
    )?;
    Ok(n)
}

pub fn set_allow_save(conn: &Connection, kind: ContentKind, id: Uuid, allow: bool) -> Result<usize> {
    let n = conn.execute(
        &format!("UPDATE {} SET allow_save = ?2 WHERE id = ?1", kind.table()),
        params![id, allow],
    )?;
    Ok(n)
}

/// Back to a plain, active, never-published row.
pub fn reset_template_fields(conn: &Connection, kind: ContentKind, id: Uuid) -> Result<usize> {
    let n = conn.execute(
        &format!(
            "UPDATE {} SET template_version = 1,
                           published_at = NULL,
                           is_session0_ready = 0,
                           allow_save = 0,
                           content_mode = 'active',
                           inactive_reason = NULL
             WHERE id = ?1",
            kind.table()
        ),
        [id],
    )?;
    Ok(n)
}
