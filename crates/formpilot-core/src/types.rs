//! Chat session and message types
//!
//! Sessions and messages are keyed by ULIDs so history sorts by creation
//! time without a separate timestamp index.

use chrono::{DateTime, Utc};
use formpilot_document::CommandInvocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Identifier of the form being edited (owned by the host application)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(String);

impl FormId {
    /// Wrap a host form id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Unique chat session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique chat message identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Generate new message ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human user (or a synthetic prompt sent on their behalf)
    User,
    /// Language-model agent
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One conversation per form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Session id
    pub id: SessionId,
    /// Form the session edits
    pub form_id: FormId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Fresh session for `form_id`
    #[must_use]
    pub fn new(form_id: FormId) -> Self {
        Self {
            id: SessionId::new(),
            form_id,
            created_at: Utc::now(),
        }
    }
}

/// A persisted chat message
///
/// Assistant messages carry their command invocations verbatim so they can
/// be applied later without re-running the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id
    pub id: MessageId,
    /// Owning session
    pub session_id: SessionId,
    /// Author
    pub role: Role,
    /// Full text
    pub text: String,
    /// Commands the agent asked for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_invocations: Vec<CommandInvocation>,
    /// Set once the user confirmed the commands; never unset
    #[serde(default)]
    pub applied: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// New, not yet applied message
    #[must_use]
    pub fn new(
        session_id: SessionId,
        role: Role,
        text: impl Into<String>,
        command_invocations: Vec<CommandInvocation>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role,
            text: text.into(),
            command_invocations,
            applied: false,
            created_at: Utc::now(),
        }
    }

    /// Whether the message carries commands awaiting confirmation
    #[inline]
    #[must_use]
    pub fn has_commands(&self) -> bool {
        !self.command_invocations.is_empty()
    }

    /// Set the applied flag; returns false if it was already set
    #[inline]
    pub fn mark_applied(&mut self) -> bool {
        !std::mem::replace(&mut self.applied, true)
    }
}
