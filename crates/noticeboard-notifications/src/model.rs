//! Notification entity and its wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::format_timestamp;

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Store-assigned identifier, increasing in insertion order.
    pub id: i64,
    /// Recipient. Not checked against any user registry.
    pub user_id: i64,
    /// Message text.
    pub content: String,
    /// When the notification was sent.
    pub sent_on: DateTime<Utc>,
    /// When the notification was read; `None` while unread.
    pub read_on: Option<DateTime<Utc>>,
}

impl Notification {
    /// Whether a read receipt has been recorded.
    pub fn is_read(&self) -> bool {
        self.read_on.is_some()
    }

    /// Locator for this record, e.g. `/notifications/42`.
    pub fn url(&self) -> String {
        noticeboard_types::notification_url(self.id)
    }

    /// Builds the serialized form returned to API clients.
    pub fn to_record(&self) -> NotificationRecord {
        NotificationRecord::from(self)
    }
}

/// A validated notification that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: i64,
    pub content: String,
    pub sent_on: DateTime<Utc>,
    pub read_on: Option<DateTime<Utc>>,
}

/// Field changes applied by the free-form edit path. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationUpdate {
    pub content: Option<String>,
    pub read_on: Option<DateTime<Utc>>,
}

impl NotificationUpdate {
    /// Whether this update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.read_on.is_none()
    }
}

/// Serialized notification: `{ url, user_id, content, sent_on, read_on }`.
///
/// Timestamps are RFC 3339 strings in UTC; `read_on` is `null` while unread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub url: String,
    pub user_id: i64,
    pub content: String,
    pub sent_on: String,
    pub read_on: Option<String>,
}

impl From<&Notification> for NotificationRecord {
    fn from(n: &Notification) -> Self {
        Self {
            url: n.url(),
            user_id: n.user_id,
            content: n.content.clone(),
            sent_on: format_timestamp(&n.sent_on),
            read_on: n.read_on.as_ref().map(format_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_shape_includes_null_read_on() {
        let n = Notification {
            id: 3,
            user_id: 1,
            content: "Test1".to_string(),
            sent_on: Utc.with_ymd_and_hms(2020, 10, 10, 10, 0, 0).unwrap(),
            read_on: None,
        };

        let json = serde_json::to_value(n.to_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "/notifications/3",
                "user_id": 1,
                "content": "Test1",
                "sent_on": "2020-10-10T10:00:00Z",
                "read_on": null
            })
        );
    }

    #[test]
    fn record_carries_read_on_when_present() {
        let n = Notification {
            id: 4,
            user_id: 2,
            content: "Test2".to_string(),
            sent_on: Utc.with_ymd_and_hms(2020, 10, 10, 10, 0, 0).unwrap(),
            read_on: Some(Utc.with_ymd_and_hms(2020, 10, 10, 11, 0, 0).unwrap()),
        };
        assert!(n.is_read());
        assert_eq!(
            n.to_record().read_on.as_deref(),
            Some("2020-10-10T11:00:00Z")
        );
    }
}
