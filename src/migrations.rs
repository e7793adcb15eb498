//! Embedded schema migrations.
//!
//! Migrations are numbered SQL files compiled in with `include_str!` and
//! applied in order. Each one runs in its own transaction together with its
//! `schema_version` row, so a failed migration leaves no partial schema
//! behind.

use rusqlite::{Connection, DatabaseName};

use crate::db::DbError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "baseline",
    sql: include_str!("migrations/001_baseline.sql"),
}];

const SCHEMA_VERSION_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

fn migration_error(context: &str, e: rusqlite::Error) -> DbError {
    DbError::Migration(format!("{context}: {e}"))
}

fn schema_version(conn: &Connection) -> Result<i64, DbError> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(|e| migration_error("Failed to read schema version", e))
}

fn latest_version() -> i64 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Copy a file-backed database to `<path>.pre-migration.bak`. In-memory and
/// temporary databases have no path and are skipped.
fn backup_before_migration(conn: &Connection) -> Result<(), DbError> {
    let Some(path) = conn.path().filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let backup_path = format!("{path}.pre-migration.bak");
    conn.backup(DatabaseName::Main, &backup_path, None)
        .map_err(|e| migration_error("Pre-migration backup failed", e))?;
    log::info!("Pre-migration backup written to {}", backup_path);
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), DbError> {
    let context = format!("Migration {:03}_{}", migration.version, migration.name);
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| migration_error(&context, e))?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(&context, e))?;
    tx.execute(
        "INSERT INTO schema_version (version, name) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.name],
    )
    .map_err(|e| migration_error(&context, e))?;
    tx.commit().map_err(|e| migration_error(&context, e))?;
    log::info!("Applied {}", context.to_lowercase());
    Ok(())
}

/// Bring the schema up to date and return how many migrations ran.
///
/// A database stamped with a version this build does not know is refused
/// rather than written to.
pub fn run_migrations(conn: &Connection) -> Result<usize, DbError> {
    conn.execute_batch(SCHEMA_VERSION_DDL)
        .map_err(|e| migration_error("Failed to create schema_version", e))?;

    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::Migration(format!(
            "Database schema version {current} is newer than this build of leadqueue supports ({latest})"
        )));
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        return Ok(0);
    }
    // A fresh file has nothing worth copying.
    if current > 0 {
        backup_before_migration(conn)?;
    }
    for migration in &pending {
        apply(conn, migration)?;
    }
    Ok(pending.len())
}
