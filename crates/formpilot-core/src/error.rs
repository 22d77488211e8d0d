//! Error types for the form editor
//!
//! The document itself never fails to update: engine no-ops are outcomes,
//! not errors. What can fail is everything around it:
//! - The agent channel (send failures, mid-turn errors, busy status)
//! - Waiting for the channel to become idle
//! - Persistence (always best-effort from the editor's point of view)
//! - Configuration loading

use crate::channel::ChannelStatus;
use crate::types::{FormId, MessageId, SessionId};
use formpilot_document::DocumentError;
use std::path::PathBuf;

/// Main editor error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Agent channel reported an error
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Channel is not idle; a new message cannot be sent yet
    #[error("channel is busy ({0})")]
    ChannelBusy(ChannelStatus),

    /// Channel stayed busy past the configured bound
    #[error("channel still busy after {waited_ms}ms, continuation abandoned")]
    ContinuationTimeout {
        /// Time spent waiting
        waited_ms: u64,
    },

    /// Chat store failure
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Message id is not part of this session
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    /// Form state handed to the editor breaks a document invariant
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),
}

impl CoreError {
    /// Check if error is retryable
    ///
    /// Nothing retries automatically; this only tells the caller that trying
    /// the same operation later may succeed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChannelBusy(_) | Self::ContinuationTimeout { .. })
    }
}

/// Agent channel failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Request could not be sent
    #[error("send failed: {0}")]
    Send(String),

    /// Stream reported an error mid-turn
    #[error("stream failed: {0}")]
    Stream(String),

    /// Channel status is `error`
    #[error("channel is in error state")]
    ErrorStatus,
}

/// Chat store failures
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem failure
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored data could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No session for this id
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// No message for this id
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// A stored history belongs to a different form
    #[error("history for form {requested} holds form {stored}")]
    FormMismatch {
        /// Form that was asked for
        requested: FormId,
        /// Form recorded in the history
        stored: FormId,
    },

    /// Store-specific failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Wrap an I/O error with its path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Config file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Result alias for editor operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, PersistenceError>;
