//! Notification records for the Noticeboard service.
//!
//! Implements the notification entity, its validated write path, and its
//! filtered read path over an injected record store:
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Validator`] | create / edit with temporal invariants and the edit policy |
//! | [`NotificationFilter`] | `{user_id, read}` listing predicate |
//! | [`NotificationStore`] | storage seam, with SQLite and in-memory impls |
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use noticeboard_notifications::{
//!     list_notifications, CreateNotification, MemoryNotificationStore, NotificationFilter,
//!     Validator,
//! };
//! use noticeboard_types::EditPolicy;
//!
//! let store = Arc::new(MemoryNotificationStore::new());
//! let validator = Validator::with_system_clock(store.clone(), EditPolicy::WriteOnce);
//! validator.create(&CreateNotification {
//!     user_id: 1,
//!     sent_on: "2020-11-16T20:08:39.128358".to_string(),
//!     content: "hello".to_string(),
//!     read_on: None,
//! })?;
//! let unread = list_notifications(store.as_ref(), &NotificationFilter::for_user(1).with_read(false))?;
//! ```

mod clock;
mod error;
mod model;
mod query;
mod sqlite;
mod store;
pub mod timestamp;
mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{NotificationError, StoreError};
pub use model::{NewNotification, Notification, NotificationRecord, NotificationUpdate};
pub use query::{fetch_notification, list_notifications, NotificationFilter};
pub use sqlite::SqliteNotificationStore;
pub use store::{MemoryNotificationStore, NotificationStore};
pub use validator::{CreateNotification, EditNotification, Validator};
