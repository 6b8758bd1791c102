//! Schema migrations for the notification database.
//!
//! `000_notifications` creates the `notifications` table; ids come from
//! `AUTOINCREMENT` so a deleted notification's id is never handed out again.
//! `001_notifications_user_index` adds the `(user_id, read_on)` index behind
//! the per-user read/unread listings. Applied names are recorded in
//! `_noticeboard_migrations`.

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// Notification schema history, oldest first. Append only.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_notifications",
        sql: include_str!("migrations/000_notifications.sql"),
    },
    Migration {
        name: "001_notifications_user_index",
        sql: include_str!("migrations/001_notifications_user_index.sql"),
    },
];

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the notification schema up to date on `conn` and returns how many
/// migrations were applied. Safe to call on every startup.
///
/// # Errors
///
/// Returns `MigrationError` if a schema step fails (that step is rolled back
/// together with its tracking row) or if `_noticeboard_migrations` cannot be
/// read.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply_pending(conn, MIGRATIONS)
}

/// Applies each not-yet-recorded entry of `migrations` in its own transaction.
fn apply_pending(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _noticeboard_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| MigrationError::ExecutionFailed {
        name: "_noticeboard_migrations_bootstrap".to_string(),
        source: e,
    })?;

    let mut applied = 0;

    for migration in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _noticeboard_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(migration = migration.name, "migration already applied, skipping");
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        // Schema changes and the tracking row commit together or not at all.
        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _noticeboard_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    #[test]
    fn run_migrations_on_fresh_db() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, MIGRATIONS.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM _noticeboard_migrations", [], |row| {
                row.get(0)
            })
            .expect("should query migration count");
        assert_eq!(count, MIGRATIONS.len() as i64);
        assert!(table_exists(&conn, "notifications"));
    }

    #[test]
    fn user_listing_index_is_created() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_index_info('idx_notifications_user_read')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["user_id", "read_on"]);
    }

    #[test]
    fn run_migrations_idempotent() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");

        let first = run_migrations(&conn).expect("first run should succeed");
        assert_eq!(first, MIGRATIONS.len());

        let second = run_migrations(&conn).expect("second run should succeed");
        assert_eq!(second, 0, "no new migrations to apply");
    }

    #[test]
    fn notification_ids_are_never_reused() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        run_migrations(&conn).expect("migrations should succeed");

        let insert = "INSERT INTO notifications (user_id, content, sent_on) VALUES (1, 'x', '2020-01-01T00:00:00Z')";
        conn.execute(insert, []).unwrap();
        conn.execute(insert, []).unwrap();
        conn.execute("DELETE FROM notifications WHERE id = 2", [])
            .unwrap();
        conn.execute(insert, []).unwrap();

        let max_id: i64 = conn
            .query_row("SELECT MAX(id) FROM notifications", [], |row| row.get(0))
            .unwrap();
        assert_eq!(max_id, 3, "AUTOINCREMENT must not hand out a deleted id again");
    }

    #[test]
    fn migration_side_effects_rollback_when_tracking_insert_fails() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let migrations = [Migration {
            name: "001_tracking_insert_conflict",
            sql: "
                CREATE TABLE half_applied (id INTEGER PRIMARY KEY);
                INSERT INTO _noticeboard_migrations (name) VALUES ('001_tracking_insert_conflict');
            ",
        }];

        let err = apply_pending(&conn, &migrations)
            .expect_err("tracking insert conflict should fail migration");

        match err {
            MigrationError::ExecutionFailed { name, .. } => {
                assert_eq!(name, "001_tracking_insert_conflict")
            }
            other => panic!("unexpected error type: {other:?}"),
        }

        assert!(
            !table_exists(&conn, "half_applied"),
            "schema side effects should be rolled back when tracking insert fails"
        );
    }
}
