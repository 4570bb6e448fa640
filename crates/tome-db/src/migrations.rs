use anyhow::Result;
use rusqlite::Connection;
use tome_types::ContentKind;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (content tables, snapshots, saves)");
        let mut batch = String::from("BEGIN;\n");
        for kind in ContentKind::ALL {
            batch.push_str(&content_table(kind.table()));
        }
        batch.push_str(
            "
            CREATE TABLE template_snapshots (
                id                  BLOB PRIMARY KEY,
                user_id             BLOB NOT NULL,
                content_type        TEXT NOT NULL,
                content_id          BLOB NOT NULL,
                version             INTEGER NOT NULL CHECK (version >= 1),
                version_name        TEXT,
                version_notes       TEXT,
                snapshot_data       TEXT NOT NULL,
                is_public           INTEGER NOT NULL DEFAULT 0,
                allow_save          INTEGER NOT NULL DEFAULT 0,
                attribution_name    TEXT,
                save_count          INTEGER NOT NULL DEFAULT 0 CHECK (save_count >= 0),
                published_at        TEXT NOT NULL,
                UNIQUE (content_type, content_id, version)
            );

            -- Survives unpublish so version numbers are never handed out twice
            CREATE TABLE template_version_counters (
                content_type    TEXT NOT NULL,
                content_id      BLOB NOT NULL,
                last_version    INTEGER NOT NULL,
                PRIMARY KEY (content_type, content_id)
            );

            CREATE TABLE content_saves (
                id                          BLOB PRIMARY KEY,
                user_id                     BLOB NOT NULL,
                snapshot_id                 BLOB NOT NULL REFERENCES template_snapshots(id),
                source_type                 TEXT NOT NULL,
                source_name                 TEXT NOT NULL,
                source_owner_id             BLOB NOT NULL,
                saved_version               INTEGER NOT NULL,
                latest_available_version    INTEGER NOT NULL,
                update_available            INTEGER NOT NULL DEFAULT 0,
                instance_id                 BLOB,
                saved_at                    TEXT NOT NULL,
                started_playing_at          TEXT,
                UNIQUE (user_id, snapshot_id)
            );

            CREATE INDEX idx_saves_user ON content_saves(user_id, saved_at);
            CREATE INDEX idx_saves_snapshot ON content_saves(snapshot_id);

            INSERT INTO schema_version (version) VALUES (1);
            COMMIT;
            ",
        );
        conn.execute_batch(&batch)?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// All three content kinds share one layout. The CHECK keeps
/// `inactive_reason` present exactly when the row is inactive.
fn content_table(table: &str) -> String {
    format!(
        "
        CREATE TABLE {table} (
            id                      BLOB PRIMARY KEY,
            user_id                 BLOB NOT NULL,
            name                    TEXT NOT NULL,
            data                    TEXT NOT NULL DEFAULT '{{}}',
            content_mode            TEXT NOT NULL DEFAULT 'active'
                                    CHECK (content_mode IN ('active', 'inactive')),
            inactive_reason         TEXT,
            deleted_at              TEXT,
            template_version        INTEGER NOT NULL DEFAULT 1,
            published_at            TEXT,
            is_session0_ready       INTEGER NOT NULL DEFAULT 0,
            allow_save              INTEGER NOT NULL DEFAULT 0,
            template_source_id      BLOB,
            saved_template_version  INTEGER,
            created_at              TEXT NOT NULL,
            CHECK ((content_mode = 'inactive') = (inactive_reason IS NOT NULL))
        );

        CREATE INDEX idx_{table}_owner_deleted ON {table}(user_id, deleted_at);
        "
    )
}
