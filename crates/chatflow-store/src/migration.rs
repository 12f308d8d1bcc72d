//! Versioned schema migrations.
//!
//! Each migration is a static SQL batch keyed by version number.  Applied
//! versions are recorded in `_migrations`, so running the set again is a
//! no-op.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order.  Append only.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "rules table",
        sql: r#"
            CREATE TABLE rules (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                name        TEXT,
                created_by  TEXT NOT NULL,
                created_at  INTEGER NOT NULL,
                enabled     BOOLEAN NOT NULL DEFAULT 1,
                trigger     TEXT NOT NULL,
                actions     TEXT NOT NULL CHECK(json_array_length(actions) > 0)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "rule update timestamps and enabled index",
        sql: r#"
            ALTER TABLE rules ADD COLUMN updated_at INTEGER;
            UPDATE rules SET updated_at = created_at;
            CREATE INDEX idx_rules_enabled ON rules(enabled);
        "#,
    },
];

// ── public API ───────────────────────────────────────────────────────

/// Apply every migration newer than the recorded version.
///
/// Synchronous; call it through [`crate::Database::execute`].
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "rule schema is up to date");
        return Ok(());
    }

    info!(current_version = current, pending = pending.len(), "running pending migrations");
    for migration in pending {
        apply(conn, migration)?;
    }
    Ok(())
}

/// The latest applied migration version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
        row.get(0)
    })
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

// ── internals ────────────────────────────────────────────────────────

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
        message: format!("failed to create _migrations table: {e}"),
    })
}

/// Apply one migration inside an immediate transaction.
fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(version = migration.version, description = migration.description, "applying migration");

    let failed = |message: String| StoreError::Migration {
        version: migration.version,
        message,
    };

    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| failed(format!("failed to begin transaction: {e}")))?;

    let result = conn
        .execute_batch(migration.sql)
        .map_err(|e| failed(format!("SQL execution failed: {e}")))
        .and_then(|()| {
            conn.execute(
                "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![migration.version, migration.description, chrono::Utc::now().timestamp()],
            )
            .map(|_| ())
            .map_err(|e| failed(format!("failed to record migration: {e}")))
        });

    match result {
        Ok(()) => conn
            .execute_batch("COMMIT;")
            .map_err(|e| failed(format!("failed to commit: {e}"))),
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
            Err(err)
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
