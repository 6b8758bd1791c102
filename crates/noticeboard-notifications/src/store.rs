//! The record store seam and its in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{NewNotification, Notification, NotificationUpdate};
use crate::query::NotificationFilter;

/// Durable keyed storage for notifications.
///
/// Implementations must assign unique, increasing ids and must make
/// [`NotificationStore::mark_read`] atomic with respect to other writers of
/// the same record.
pub trait NotificationStore: Send + Sync {
    /// Persists a new notification and returns it with its assigned id.
    fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError>;

    /// Loads a notification by id.
    fn get(&self, id: i64) -> Result<Option<Notification>, StoreError>;

    /// Sets `read_on` only if the notification exists and is still unread.
    ///
    /// Returns `false` when the condition did not hold and nothing changed.
    fn mark_read(&self, id: i64, read_on: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Unconditionally applies `update` and returns the updated notification,
    /// or `None` if it does not exist.
    fn update(
        &self,
        id: i64,
        update: &NotificationUpdate,
    ) -> Result<Option<Notification>, StoreError>;

    /// Returns every notification matching `filter`.
    fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    rows: BTreeMap<i64, Notification>,
}

/// A process-local store. Each instance is fully isolated, which makes it
/// suitable for tests that run in parallel.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    state: Mutex<MemoryState>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl NotificationStore for MemoryNotificationStore {
    fn insert(&self, new: &NewNotification) -> Result<Notification, StoreError> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let notification = Notification {
            id: state.last_id,
            user_id: new.user_id,
            content: new.content.clone(),
            sent_on: new.sent_on,
            read_on: new.read_on,
        };
        state.rows.insert(notification.id, notification.clone());
        Ok(notification)
    }

    fn get(&self, id: i64) -> Result<Option<Notification>, StoreError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn mark_read(&self, id: i64, read_on: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        match state.rows.get_mut(&id) {
            Some(row) if row.read_on.is_none() => {
                row.read_on = Some(read_on);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn update(
        &self,
        id: i64,
        update: &NotificationUpdate,
    ) -> Result<Option<Notification>, StoreError> {
        let mut state = self.lock()?;
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = &update.content {
            row.content = content.clone();
        }
        if let Some(read_on) = update.read_on {
            row.read_on = Some(read_on);
        }
        Ok(Some(row.clone()))
    }

    fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .rows
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }
}
