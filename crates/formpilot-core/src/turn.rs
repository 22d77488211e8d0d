//! Assembling a streamed turn into one assistant message

use crate::channel::{ChannelEvent, InvocationPart};
use crate::error::ChannelError;
use formpilot_document::CommandInvocation;
use futures::stream::{BoxStream, StreamExt};
use tracing::debug;

/// A finished (or interrupted) assistant turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    /// Concatenated text fragments
    pub text: String,
    /// Complete invocations in first-seen order
    pub invocations: Vec<CommandInvocation>,
    /// Cancelled, or the stream ended without `Finished`
    pub interrupted: bool,
}

/// Collects channel events for one turn
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    parts: Vec<InvocationPart>,
    finished: bool,
    cancelled: bool,
}

impl TurnAccumulator {
    /// Empty accumulator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event
    ///
    /// # Errors
    /// [`ChannelError::Stream`] on [`ChannelEvent::Error`]; the turn should be
    /// discarded.
    pub fn push(&mut self, event: ChannelEvent) -> Result<(), ChannelError> {
        match event {
            ChannelEvent::TextDelta(delta) => self.text.push_str(&delta),
            ChannelEvent::Invocation(part) => {
                match self.parts.iter_mut().find(|p| p.call_id == part.call_id) {
                    Some(existing) => *existing = part,
                    None => self.parts.push(part),
                }
            }
            ChannelEvent::Error(message) => return Err(ChannelError::Stream(message)),
            ChannelEvent::Finished => self.finished = true,
            ChannelEvent::Cancelled => self.cancelled = true,
        }
        Ok(())
    }

    /// Whether a terminal event arrived
    #[inline]
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.finished || self.cancelled
    }

    /// Close the turn, dropping incomplete invocations
    #[must_use]
    pub fn finish(self) -> AssistantTurn {
        let total = self.parts.len();
        let invocations: Vec<CommandInvocation> = self
            .parts
            .into_iter()
            .filter(|part| part.complete)
            .map(|part| CommandInvocation::new(part.name, part.arguments))
            .collect();

        if invocations.len() < total {
            debug!(
                dropped = total - invocations.len(),
                "incomplete invocations dropped from turn"
            );
        }

        AssistantTurn {
            text: self.text,
            invocations,
            interrupted: self.cancelled || !self.finished,
        }
    }
}

/// Drain a channel stream into one turn
///
/// Stops at the first `Finished` or `Cancelled`; a stream that simply ends
/// yields an interrupted turn.
///
/// # Errors
/// [`ChannelError::Stream`] if the stream reports an error.
pub async fn collect_turn(
    mut stream: BoxStream<'static, ChannelEvent>,
) -> Result<AssistantTurn, ChannelError> {
    let mut accumulator = TurnAccumulator::new();
    while let Some(event) = stream.next().await {
        accumulator.push(event)?;
        if accumulator.is_ended() {
            break;
        }
    }
    Ok(accumulator.finish())
}
