//! Agent channel seam
//!
//! The language model sits behind [`AgentChannel`]: send a user message, get
//! back a stream of text fragments and command invocations. Transport,
//! prompting and tool advertising are the implementation's business.

use crate::error::ChannelError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Channel activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Ready for a new message
    Idle,
    /// Request in flight, nothing received yet
    Sending,
    /// Response streaming in
    Streaming,
    /// Last turn failed
    Error,
}

impl ChannelStatus {
    /// Whether a new message may be sent
    #[inline]
    #[must_use]
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::Streaming => "streaming",
            Self::Error => "error",
        })
    }
}

/// A command invocation as it streams in
///
/// Arguments may arrive in pieces; a later part with the same `call_id`
/// supersedes an earlier one. Only parts with `complete == true` are ever
/// offered for confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationPart {
    /// Provider-assigned call id
    pub call_id: String,
    /// Command name
    pub name: String,
    /// Arguments received so far
    pub arguments: Value,
    /// Arguments are final and well-formed
    pub complete: bool,
}

impl InvocationPart {
    /// Fully received invocation
    #[must_use]
    pub fn complete(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
            complete: true,
        }
    }

    /// Invocation whose arguments are still streaming
    #[must_use]
    pub fn partial(call_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            complete: false,
            ..Self::complete(call_id, name, arguments)
        }
    }
}

/// One item of a streamed turn
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Assistant text fragment
    TextDelta(String),
    /// Command invocation update
    Invocation(InvocationPart),
    /// Turn failed
    Error(String),
    /// Turn completed normally
    Finished,
    /// Turn stopped by the user
    Cancelled,
}

/// Streaming language-model collaborator
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Start a turn with `text` as the user message
    ///
    /// # Errors
    /// [`ChannelError::Send`] when the request cannot be issued.
    async fn send(&self, text: &str) -> Result<BoxStream<'static, ChannelEvent>, ChannelError>;

    /// Current activity
    fn status(&self) -> ChannelStatus;

    /// Cancel the in-flight turn, if any
    async fn stop(&self);
}
