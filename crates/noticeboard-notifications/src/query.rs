//! Query filtering for notification listings.
//!
//! A [`NotificationFilter`] is an optional `{user_id, read}` pair. Present
//! fields restrict the result set and compose by logical AND; an empty
//! filter selects every record. The same filter is evaluated two ways: as an
//! in-process predicate ([`NotificationFilter::matches`]) and as a
//! parameterised SQL `WHERE` clause for the SQLite store.

use rusqlite::types::ToSql;
use serde::Deserialize;

use crate::error::NotificationError;
use crate::model::Notification;
use crate::store::NotificationStore;

/// Filter criteria for listing notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationFilter {
    /// Restrict to this recipient.
    pub user_id: Option<i64>,
    /// `true` selects read notifications, `false` unread ones.
    pub read: Option<bool>,
}

impl NotificationFilter {
    /// A filter that selects every notification.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter that selects one user's notifications.
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            read: None,
        }
    }

    /// Restricts the filter to read (`true`) or unread (`false`) notifications.
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    /// Whether `notification` satisfies every present criterion.
    pub fn matches(&self, notification: &Notification) -> bool {
        let user_ok = self.user_id.map_or(true, |id| notification.user_id == id);
        let read_ok = self.read.map_or(true, |read| notification.is_read() == read);
        user_ok && read_ok
    }

    /// Builds the `WHERE` clause and its bound parameters. Nothing from the
    /// filter is interpolated into the SQL text.
    pub(crate) fn sql_predicate(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(user_id) = self.user_id {
            params.push(Box::new(user_id));
            clauses.push(format!("user_id = ?{}", params.len()));
        }

        match self.read {
            Some(true) => clauses.push("read_on IS NOT NULL".to_string()),
            Some(false) => clauses.push("read_on IS NULL".to_string()),
            None => {}
        }

        if clauses.is_empty() {
            ("1 = 1".to_string(), params)
        } else {
            (clauses.join(" AND "), params)
        }
    }
}

/// Lists the notifications selected by `filter`.
///
/// Ordering is whatever the store yields and is not part of the contract.
///
/// # Errors
///
/// Returns `NotificationError::Store` if the store fails.
pub fn list_notifications(
    store: &dyn NotificationStore,
    filter: &NotificationFilter,
) -> Result<Vec<Notification>, NotificationError> {
    let notifications = store.list(filter)?;
    tracing::debug!(
        user_id = ?filter.user_id,
        read = ?filter.read,
        count = notifications.len(),
        "listed notifications"
    );
    Ok(notifications)
}

/// Fetches a single notification by id.
///
/// # Errors
///
/// Returns `NotificationError::NotFound` if no such notification exists, or
/// `NotificationError::Store` if the store fails.
pub fn fetch_notification(
    store: &dyn NotificationStore,
    id: i64,
) -> Result<Notification, NotificationError> {
    store.get(id)?.ok_or(NotificationError::NotFound(id))
}
