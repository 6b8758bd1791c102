//! Shared types and constants for the Noticeboard service.
//!
//! This crate holds the small set of definitions that more than one crate in
//! the workspace needs to agree on: the edit policy selector, content limits,
//! and the URL prefix used to build record locators. It has no dependency on
//! the database or HTTP layers.

use serde::{Deserialize, Serialize};

/// Maximum length of a notification's content, in characters.
pub const MAX_CONTENT_CHARS: usize = 256;

/// Path prefix under which individual notifications are addressable.
pub const NOTIFICATIONS_PATH: &str = "/notifications";

/// Builds the locator for a single notification, e.g. `/notifications/42`.
pub fn notification_url(id: i64) -> String {
    format!("{NOTIFICATIONS_PATH}/{id}")
}

/// Governs what the edit operation is allowed to change on an existing
/// notification.
///
/// The two policies are mutually exclusive; a running server uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPolicy {
    /// The read receipt is write-once: once `read_on` is set, every further
    /// edit is rejected. Content cannot be edited.
    #[default]
    WriteOnce,
    /// Deprecated. `read_on` may be re-set any number of times and `content`
    /// may be replaced, as long as `read_on` does not precede `sent_on`.
    FreeForm,
}

impl EditPolicy {
    /// Returns the canonical configuration label for this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WriteOnce => "write_once",
            Self::FreeForm => "free_form",
        }
    }

    /// Whether this policy permits replacing a notification's content.
    pub fn allows_content_edit(self) -> bool {
        matches!(self, Self::FreeForm)
    }
}

impl std::fmt::Display for EditPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EditPolicy {
    type Err = ParseEditPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "write_once" => Ok(Self::WriteOnce),
            "free_form" => Ok(Self::FreeForm),
            _ => Err(ParseEditPolicyError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown edit policy string.
#[derive(Debug, Clone)]
pub struct ParseEditPolicyError(pub String);

impl std::fmt::Display for ParseEditPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown edit policy: {}", self.0)
    }
}

impl std::error::Error for ParseEditPolicyError {}
