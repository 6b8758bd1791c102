//! SQLite-backed notification store.
//!
//! Rows live in the `notifications` table created by `noticeboard-db`
//! migrations. Timestamps are stored as RFC 3339 UTC text and decoded with
//! the same parser that reads API input.

use chrono::{DateTime, Utc};
use noticeboard_db::{DbConnection, DbPool};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::model::{NewNotification, Notification, NotificationUpdate};
use crate::query::NotificationFilter;
use crate::store::NotificationStore;
use crate::timestamp::{format_timestamp, parse_timestamp};

const SELECT_COLUMNS: &str = "SELECT id, user_id, content, sent_on, read_on FROM notifications";

/// A [`NotificationStore`] over a pooled SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteNotificationStore {
    pool: DbPool,
}

impl SqliteNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<DbConnection, StoreError> {
        self.pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get db connection for notification store");
            StoreError::Pool(e)
        })
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let conn = self.conn()?;
        let id: i64 = conn.query_row(
            "INSERT INTO notifications (user_id, content, sent_on, read_on)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
            params![
                new.user_id,
                new.content,
                format_timestamp(&new.sent_on),
                new.read_on.as_ref().map(format_timestamp),
            ],
            |row| row.get(0),
        )?;

        Ok(Notification {
            id,
            user_id: new.user_id,
            content: new.content.clone(),
            sent_on: new.sent_on,
            read_on: new.read_on,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        let conn = self.conn()?;
        get_notification(&conn, id)
    }

    fn mark_read(&self, id: i64, read_on: DateTime<Utc>) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        // The IS NULL guard makes the read receipt write-once even when two
        // edits race past the validator's own check.
        let count = conn.execute(
            "UPDATE notifications SET read_on = ?1 WHERE id = ?2 AND read_on IS NULL",
            params![format_timestamp(&read_on), id],
        )?;
        Ok(count == 1)
    }

    fn update(
        &self,
        id: i64,
        update: &NotificationUpdate,
    ) -> Result<Option<Notification>, StoreError> {
        let conn = self.conn()?;

        let mut set_parts: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(content) = &update.content {
            values.push(Box::new(content.clone()));
            set_parts.push(format!("content = ?{}", values.len()));
        }
        if let Some(read_on) = &update.read_on {
            values.push(Box::new(format_timestamp(read_on)));
            set_parts.push(format!("read_on = ?{}", values.len()));
        }

        if set_parts.is_empty() {
            return get_notification(&conn, id);
        }

        values.push(Box::new(id));
        let sql = format!(
            "UPDATE notifications SET {} WHERE id = ?{}",
            set_parts.join(", "),
            values.len()
        );

        let tx = conn.unchecked_transaction()?;
        let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let count = tx.execute(&sql, params.as_slice())?;
        if count == 0 {
            return Ok(None);
        }
        let updated = get_notification(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, StoreError> {
        let conn = self.conn()?;
        let (where_clause, values) = filter.sql_predicate();
        let sql = format!("{SELECT_COLUMNS} WHERE {where_clause} ORDER BY id ASC");

        let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), map_row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }
}

fn get_notification(conn: &Connection, id: i64) -> Result<Option<Notification>, StoreError> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [id], map_row_to_notification)
        .optional()?)
}

fn map_row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let sent_on: String = row.get(3)?;
    let read_on: Option<String> = row.get(4)?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        sent_on: decode_timestamp(3, &sent_on)?,
        read_on: read_on.as_deref().map(|s| decode_timestamp(4, s)).transpose()?,
    })
}

fn decode_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use noticeboard_db::{create_pool, run_migrations, DbRuntimeSettings};

    fn store() -> SqliteNotificationStore {
        let pool = create_pool(
            ":memory:",
            DbRuntimeSettings {
                busy_timeout_ms: 1_000,
                pool_max_size: 1,
            },
        )
        .expect("pool creation should succeed");
        run_migrations(&pool.get().expect("should get a connection"))
            .expect("migrations should succeed");
        SqliteNotificationStore::new(pool)
    }

    fn new_notification(user_id: i64) -> NewNotification {
        NewNotification {
            user_id,
            content: "hello".to_string(),
            sent_on: Utc.with_ymd_and_hms(2020, 11, 16, 20, 8, 39).unwrap()
                + Duration::microseconds(128_358),
            read_on: None,
        }
    }

    #[test]
    fn insert_then_get_preserves_timestamps() {
        let store = store();
        let created = store.insert(&new_notification(1)).unwrap();
        let loaded = store.get(created.id).unwrap().expect("row should exist");
        assert_eq!(loaded, created);
    }

    #[test]
    fn ids_increase_in_insertion_order() {
        let store = store();
        let a = store.insert(&new_notification(1)).unwrap();
        let b = store.insert(&new_notification(1)).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn mark_read_only_succeeds_once() {
        let store = store();
        let created = store.insert(&new_notification(1)).unwrap();
        let read_on = created.sent_on + Duration::hours(1);

        assert!(store.mark_read(created.id, read_on).unwrap());
        assert!(!store.mark_read(created.id, read_on + Duration::hours(1)).unwrap());
        assert!(!store.mark_read(999_999, read_on).unwrap());

        let loaded = store.get(created.id).unwrap().unwrap();
        assert_eq!(loaded.read_on, Some(read_on));
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let store = store();
        let created = store.insert(&new_notification(1)).unwrap();

        let updated = store
            .update(
                created.id,
                &NotificationUpdate {
                    content: Some("edited".to_string()),
                    read_on: None,
                },
            )
            .unwrap()
            .expect("row should exist");
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.read_on, None);
        assert_eq!(updated.sent_on, created.sent_on);

        assert!(store
            .update(999_999, &NotificationUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_applies_filter_in_sql() {
        let store = store();
        let a = store.insert(&new_notification(1)).unwrap();
        let b = store.insert(&new_notification(1)).unwrap();
        let c = store.insert(&new_notification(2)).unwrap();
        store.mark_read(b.id, b.sent_on).unwrap();

        let ids = |filter: NotificationFilter| -> Vec<i64> {
            let mut ids: Vec<i64> = store.list(&filter).unwrap().iter().map(|n| n.id).collect();
            ids.sort_unstable();
            ids
        };

        assert_eq!(ids(NotificationFilter::all()), vec![a.id, b.id, c.id]);
        assert_eq!(ids(NotificationFilter::for_user(1)), vec![a.id, b.id]);
        assert_eq!(ids(NotificationFilter::for_user(1).with_read(true)), vec![b.id]);
        assert_eq!(ids(NotificationFilter::all().with_read(false)), vec![a.id, c.id]);
        assert!(ids(NotificationFilter::for_user(3)).is_empty());
    }
}
