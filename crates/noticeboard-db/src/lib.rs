//! Database layer for the Noticeboard service.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The `notifications` table is created through
//! the versioned migrations managed by this crate.
//!
//! WAL mode allows concurrent readers alongside a single writer, which is the
//! access pattern of the notification API: many list/fetch calls, few edits.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open_database, DbConnection, DbPool, DbRuntimeSettings, PoolError};
