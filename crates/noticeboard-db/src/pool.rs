//! Connection pool creation and configuration.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

use crate::migrations::{run_migrations, MigrationError};

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// A connection checked out of a [`DbPool`].
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Errors that can occur when opening the notification database.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the pool or check out a connection.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),

    /// The schema could not be brought up to date.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Puts a fresh connection into WAL mode and applies the busy timeout.
///
/// In-memory databases report journal mode `memory`, which is accepted.
fn init_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !journal_mode.eq_ignore_ascii_case("wal") && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("failed to set WAL journal mode, got: {journal_mode}")),
        ));
    }
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
}

/// Creates a new SQLite connection pool with WAL mode enabled.
///
/// `db_path` is the path to the SQLite database file. Every pooled connection
/// to `:memory:` opens its own private database, so callers that need a
/// shared in-memory database must use `pool_max_size: 1`.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| init_connection(conn, busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        pool_max_size = settings.pool_max_size,
        "created database pool"
    );

    Ok(pool)
}

/// Opens the notification database: creates the pool and applies any
/// pending migrations on one of its connections.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if no connection can be opened, or
/// `PoolError::Migration` if the schema cannot be migrated.
pub fn open_database(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let pool = create_pool(db_path, settings)?;
    let applied = {
        let conn = pool.get()?;
        run_migrations(&conn)?
    };
    if applied > 0 {
        tracing::info!(path = db_path, count = applied, "applied database migrations");
    }
    Ok(pool)
}
