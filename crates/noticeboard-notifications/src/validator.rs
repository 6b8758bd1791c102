//! Validation of notification writes.
//!
//! The [`Validator`] is the only path by which notifications are created or
//! edited. It enforces the temporal invariants before anything reaches the
//! store:
//!
//! - `sent_on` is never later than the instant of creation;
//! - `read_on`, when present, is never earlier than `sent_on` and never later
//!   than the instant of the write;
//! - under [`EditPolicy::WriteOnce`] a read receipt, once recorded, is final.
//!
//! "Now" is sampled once per operation so that every comparison within a
//! single create or edit sees the same instant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use noticeboard_types::{EditPolicy, MAX_CONTENT_CHARS};
use serde::Deserialize;

use crate::clock::{Clock, SystemClock};
use crate::error::NotificationError;
use crate::model::{NewNotification, Notification, NotificationUpdate};
use crate::store::NotificationStore;
use crate::timestamp::parse_timestamp;

/// Input for creating a notification. Timestamps are raw ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateNotification {
    pub user_id: i64,
    pub sent_on: String,
    pub content: String,
    #[serde(default)]
    pub read_on: Option<String>,
}

/// Input for editing a notification.
///
/// `content` is only honoured under [`EditPolicy::FreeForm`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EditNotification {
    #[serde(default)]
    pub read_on: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Gatekeeper for every notification mutation.
pub struct Validator {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    policy: EditPolicy,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
        policy: EditPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Builds a validator that checks against wall-clock time.
    pub fn with_system_clock(store: Arc<dyn NotificationStore>, policy: EditPolicy) -> Self {
        Self::new(store, Arc::new(SystemClock), policy)
    }

    /// The edit policy this validator enforces.
    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Validates and persists a new notification.
    ///
    /// # Errors
    ///
    /// Content is checked before either timestamp.
    ///
    /// - `InvalidContent` if the content is empty or too long;
    /// - `InvalidDate` if `sent_on` or `read_on` cannot be parsed;
    /// - `FutureDate` if either lies after the current instant;
    /// - `ReadBeforeSent` if `read_on` precedes `sent_on`;
    /// - `Store` if persistence fails.
    pub fn create(&self, input: &CreateNotification) -> Result<Notification, NotificationError> {
        let now = self.clock.now();
        validate_content(&input.content)?;

        let sent_on = parse_field("sent_on", &input.sent_on)?;
        ensure_not_future("sent_on", sent_on, now)?;

        let read_on = input
            .read_on
            .as_deref()
            .map(|raw| check_read_on(raw, sent_on, now))
            .transpose()?;

        let created = self.store.insert(&NewNotification {
            user_id: input.user_id,
            content: input.content.clone(),
            sent_on,
            read_on,
        })?;

        tracing::info!(
            notification_id = created.id,
            user_id = created.user_id,
            read = created.is_read(),
            "notification created"
        );
        Ok(created)
    }

    /// Creates a notification for `user_id` that is sent at the current
    /// instant and unread.
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` for empty or oversized content, or `Store` if
    /// persistence fails.
    pub fn send(&self, user_id: i64, content: &str) -> Result<Notification, NotificationError> {
        let now = self.clock.now();
        validate_content(content)?;

        let created = self.store.insert(&NewNotification {
            user_id,
            content: content.to_string(),
            sent_on: now,
            read_on: None,
        })?;

        tracing::info!(notification_id = created.id, user_id, "notification sent");
        Ok(created)
    }

    /// Applies an edit to an existing notification under the active policy.
    ///
    /// Existence is always checked first, so a missing id yields `NotFound`
    /// whatever the edit contains.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no notification has this id;
    /// - `AlreadyRead` (write-once) if a read receipt is already recorded;
    /// - `ContentLocked` (write-once) if `content` is supplied;
    /// - `InvalidDate`, `FutureDate`, `ReadBeforeSent` for a bad `read_on`;
    /// - `InvalidContent` (free-form) for empty or oversized content;
    /// - `Store` if persistence fails.
    pub fn edit(&self, id: i64, input: &EditNotification) -> Result<Notification, NotificationError> {
        let now = self.clock.now();

        let existing = self
            .store
            .get(id)?
            .ok_or(NotificationError::NotFound(id))?;

        match self.policy {
            EditPolicy::WriteOnce => self.edit_write_once(existing, input, now),
            EditPolicy::FreeForm => self.edit_free_form(existing, input, now),
        }
    }

    fn edit_write_once(
        &self,
        existing: Notification,
        input: &EditNotification,
        now: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        if existing.is_read() {
            return Err(NotificationError::AlreadyRead(existing.id));
        }
        if input.content.is_some() {
            return Err(NotificationError::ContentLocked);
        }
        let Some(raw) = input.read_on.as_deref() else {
            return Ok(existing);
        };

        let read_on = check_read_on(raw, existing.sent_on, now)?;

        if !self.store.mark_read(existing.id, read_on)? {
            // Another edit recorded a receipt between our read and write.
            return Err(NotificationError::AlreadyRead(existing.id));
        }

        tracing::info!(notification_id = existing.id, "notification marked read");
        Ok(Notification {
            read_on: Some(read_on),
            ..existing
        })
    }

    fn edit_free_form(
        &self,
        existing: Notification,
        input: &EditNotification,
        now: DateTime<Utc>,
    ) -> Result<Notification, NotificationError> {
        let mut update = NotificationUpdate::default();

        if let Some(raw) = input.read_on.as_deref() {
            update.read_on = Some(check_read_on(raw, existing.sent_on, now)?);
        }
        if let Some(content) = &input.content {
            validate_content(content)?;
            update.content = Some(content.clone());
        }

        if update.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update(existing.id, &update)?
            .ok_or(NotificationError::NotFound(existing.id))?;

        tracing::info!(notification_id = updated.id, "notification edited");
        Ok(updated)
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<DateTime<Utc>, NotificationError> {
    parse_timestamp(raw).map_err(|_| NotificationError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

fn ensure_not_future(
    field: &'static str,
    value: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), NotificationError> {
    if value > now {
        return Err(NotificationError::FutureDate { field, value });
    }
    Ok(())
}

/// Parses a `read_on` input and checks it against `sent_on` and `now`.
fn check_read_on(
    raw: &str,
    sent_on: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, NotificationError> {
    let read_on = parse_field("read_on", raw)?;
    ensure_not_future("read_on", read_on, now)?;
    if read_on < sent_on {
        return Err(NotificationError::ReadBeforeSent { sent_on, read_on });
    }
    Ok(read_on)
}

fn validate_content(content: &str) -> Result<(), NotificationError> {
    if content.is_empty() {
        return Err(NotificationError::InvalidContent(
            "content must not be empty".to_string(),
        ));
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(NotificationError::InvalidContent(format!(
            "content is {chars} characters, maximum is {MAX_CONTENT_CHARS}"
        )));
    }
    Ok(())
}
