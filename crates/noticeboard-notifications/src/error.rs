//! Error types for notification validation and storage.

use chrono::{DateTime, Utc};

/// Faults raised by a [`NotificationStore`](crate::NotificationStore)
/// implementation. These are system faults, not request validation failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A SQLite statement failed.
    #[error("notification store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be checked out.
    #[error("notification store pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// An in-memory store lock was poisoned by a panicking writer.
    #[error("notification store lock poisoned")]
    Poisoned,
}

/// Errors returned by notification create, edit, list, and fetch operations.
///
/// Every variant except [`NotificationError::Store`] is a request-level
/// validation failure detected before anything is persisted.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// A timestamp field could not be parsed.
    #[error("invalid {field} date: '{value}'")]
    InvalidDate {
        /// Name of the offending field.
        field: &'static str,
        /// The raw input.
        value: String,
    },

    /// A timestamp lies after the instant the operation was evaluated.
    #[error("{field} date is in the future: {value}")]
    FutureDate {
        /// Name of the offending field.
        field: &'static str,
        /// The parsed timestamp.
        value: DateTime<Utc>,
    },

    /// `read_on` precedes `sent_on`.
    #[error("read_on date {read_on} predates sent_on date {sent_on}")]
    ReadBeforeSent {
        /// The notification's send time.
        sent_on: DateTime<Utc>,
        /// The rejected read time.
        read_on: DateTime<Utc>,
    },

    /// The notification already carries a read receipt.
    #[error("notification {0} has already been read")]
    AlreadyRead(i64),

    /// No notification exists with the given id.
    #[error("notification {0} not found")]
    NotFound(i64),

    /// Content is empty or longer than the allowed maximum.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Content edits are not permitted by the active edit policy.
    #[error("notification content cannot be edited")]
    ContentLocked,

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NotificationError {
    /// Machine-readable name of the failure, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidDate { .. } => "InvalidDate",
            Self::FutureDate { .. } => "FutureDate",
            Self::ReadBeforeSent { .. } => "ReadBeforeSent",
            Self::AlreadyRead(_) => "AlreadyRead",
            Self::NotFound(_) => "NotFound",
            Self::InvalidContent(_) => "InvalidContent",
            Self::ContentLocked => "ContentLocked",
            Self::Store(_) => "Internal",
        }
    }
}
