//! Versioned schema migrations.
//!
//! Each migration is a static SQL batch tagged with a version. Applied
//! versions are recorded in `_migrations`, so running the set twice is a
//! no-op.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Ordered migration list. Append only.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "workouts table",
        sql: r#"
            CREATE TABLE workouts (
                id           TEXT PRIMARY KEY,
                owner_id     TEXT NOT NULL,
                exercise     TEXT NOT NULL,
                set_count    INTEGER NOT NULL CHECK(set_count >= 0),
                rep_count    INTEGER NOT NULL CHECK(rep_count >= 0),
                weight       TEXT NOT NULL,
                rest_seconds INTEGER,
                notes        TEXT,
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            );
            CREATE INDEX idx_workouts_owner_created ON workouts(owner_id, created_at DESC);
        "#,
    },
    Migration {
        version: 2,
        description: "index for exercise lookups",
        sql: r#"
            CREATE INDEX idx_workouts_owner_exercise ON workouts(owner_id, exercise COLLATE NOCASE);
        "#,
    },
];

/// Apply every migration newer than the recorded version.
///
/// Synchronous; run it through [`crate::Database::execute`].
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "workout schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "migrating workout schema"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    Ok(())
}

/// Highest applied version, or 0 if none. Never writes, so it is safe on a
/// read-only connection.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    let tracked: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_migrations')",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Migration {
            version: 0,
            message: format!("cannot inspect schema: {e}"),
        })?;
    if !tracked {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("cannot read schema version: {e}"),
    })
}

/// Version the newest binary expects.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("cannot create _migrations: {e}"),
    })
}

fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    let version = migration.version;
    let fail = |stage: &str, e: rusqlite::Error| StoreError::Migration {
        version,
        message: format!("{stage}: {e}"),
    };

    info!(version, description = migration.description, "applying migration");

    // `Connection::transaction` needs `&mut`, so the transaction is driven by hand.
    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| fail("begin", e))?;

    let result = conn
        .execute_batch(migration.sql)
        .map_err(|e| fail("execute", e))
        .and_then(|()| {
            conn.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![version, migration.description, chrono::Utc::now().timestamp()],
            )
            .map(|_| ())
            .map_err(|e| fail("record", e))
        });

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT;").map_err(|e| fail("commit", e))?;
            info!(version, "migration applied");
            Ok(())
        }
        Err(err) => {
            warn!(version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
            Err(err)
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
