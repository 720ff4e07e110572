//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register task schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Confirm the `tasks` table carries every column the task store binds.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A failed migration rolls back the whole pending batch.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_tasks",
    sql: include_str!("0001_init.sql"),
}];

/// Columns `SqliteTaskStore` reads and writes.
const TASK_COLUMNS: &[&str] = &[
    "id",
    "description",
    "category",
    "priority",
    "status",
    "deadline",
    "created_at",
    "updated_at",
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations, then checks the `tasks` table shape.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version < latest {
        let tx = conn.transaction()?;
        for migration in MIGRATIONS
            .iter()
            .filter(|migration| migration.version > current_version)
        {
            run_migration(&tx, migration)?;
            info!(
                "event=db_migrate module=db status=step version={} migration={}",
                migration.version, migration.name
            );
        }
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            current_version, latest
        );
    }

    verify_task_table(conn)
}

fn run_migration(conn: &Connection, migration: &Migration) -> DbResult<()> {
    conn.execute_batch(migration.sql)
        .and_then(|()| {
            conn.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
        })
        .map_err(|source| {
            error!(
                "event=db_migrate module=db status=error version={} migration={} error_code=migration_failed error={}",
                migration.version, migration.name, source
            );
            DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            }
        })
}

fn verify_task_table(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('tasks');")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let missing: Vec<&'static str> = TASK_COLUMNS
        .iter()
        .copied()
        .filter(|column| !present.iter().any(|name| name == column))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    error!(
        "event=db_migrate module=db status=error error_code=task_table_incompatible missing={}",
        missing.join(",")
    );
    Err(DbError::IncompatibleTaskTable { missing })
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
