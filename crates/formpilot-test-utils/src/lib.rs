//! Testing utilities for the Formpilot workspace
//!
//! Document fixtures, a scripted agent channel and a chat store that always
//! fails.

#![allow(missing_docs)]

use async_trait::async_trait;
use formpilot_core::{
    AgentChannel, ChannelError, ChannelEvent, ChannelStatus, ChatMessage, ChatSession, ChatStore,
    FormId, InvocationPart, MessageId, PersistenceError, Role, SessionId, StoreResult,
};
use formpilot_document::{
    CommandInvocation, Document, Element, ElementType, FormCommand, Row, RowId, Section,
};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;

// ----------------------------------------------------------------------
// Document fixtures
// ----------------------------------------------------------------------

pub fn text_field(id: &str, label: &str) -> Element {
    Element::new(id, ElementType::TextField).with_attribute("label", label)
}

/// Builds documents row by row; row ids are `<section>-r<n>`
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    sections: Vec<Section>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, id: &str, title: &str) -> Self {
        self.sections.push(Section::new(id, title));
        self
    }

    /// Append a row to the last section; panics with no section or more than
    /// two elements
    pub fn row(mut self, elements: Vec<Element>) -> Self {
        let section = self
            .sections
            .pop()
            .expect("DocumentBuilder::row called before section");
        let row_id = RowId::new(format!("{}-r{}", section.id, section.rows.len() + 1));
        let row = Row::with_elements(row_id, elements).expect("row over capacity");
        self.sections.push(section.with_row(row));
        self
    }

    pub fn build(self) -> Document {
        Document::from_sections(self.sections)
    }
}

/// `contact` section with `name`/`email` side by side and `message` alone
pub fn contact_form() -> Document {
    DocumentBuilder::new()
        .section("contact", "Contact")
        .row(vec![text_field("name", "Name"), text_field("email", "Email")])
        .row(vec![text_field("message", "Message")])
        .build()
}

/// Invocations as an agent would send them
pub fn invocations(commands: &[FormCommand]) -> Vec<CommandInvocation> {
    commands.iter().map(CommandInvocation::from).collect()
}

/// A finished turn: text then one complete invocation per command
pub fn turn_with_commands(text: &str, commands: &[FormCommand]) -> Vec<ChannelEvent> {
    let mut events = vec![ChannelEvent::TextDelta(text.to_string())];
    events.extend(invocations(commands).into_iter().enumerate().map(|(i, inv)| {
        ChannelEvent::Invocation(InvocationPart::complete(
            format!("call-{i}"),
            inv.name,
            inv.arguments,
        ))
    }));
    events.push(ChannelEvent::Finished);
    events
}

pub fn text_turn(text: &str) -> Vec<ChannelEvent> {
    vec![ChannelEvent::TextDelta(text.to_string()), ChannelEvent::Finished]
}

// ----------------------------------------------------------------------
// Scripted channel
// ----------------------------------------------------------------------

/// Channel that replays queued turns
///
/// An unscripted send yields an empty finished turn. `busy_for(n)` makes the
/// next `n` status polls report `Streaming`.
#[derive(Debug)]
pub struct ScriptedChannel {
    turns: Mutex<VecDeque<Vec<ChannelEvent>>>,
    status: Mutex<ChannelStatus>,
    busy_polls: Mutex<usize>,
    send_error: Mutex<Option<ChannelError>>,
    sent: Mutex<Vec<String>>,
    stops: Mutex<usize>,
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self {
            turns: Mutex::new(VecDeque::new()),
            status: Mutex::new(ChannelStatus::Idle),
            busy_polls: Mutex::new(0),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            stops: Mutex::new(0),
        }
    }
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_turn(&self, events: Vec<ChannelEvent>) {
        self.turns.lock().push_back(events);
    }

    pub fn set_status(&self, status: ChannelStatus) {
        *self.status.lock() = status;
    }

    pub fn busy_for(&self, polls: usize) {
        *self.busy_polls.lock() = polls;
    }

    /// Make every following `send` fail
    pub fn fail_sends(&self, error: ChannelError) {
        *self.send_error.lock() = Some(error);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn last_sent(&self) -> Option<String> {
        self.sent.lock().last().cloned()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.lock()
    }
}

#[async_trait]
impl AgentChannel for ScriptedChannel {
    async fn send(&self, text: &str) -> Result<BoxStream<'static, ChannelEvent>, ChannelError> {
        self.sent.lock().push(text.to_string());
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        let events = self
            .turns
            .lock()
            .pop_front()
            .unwrap_or_else(|| vec![ChannelEvent::Finished]);
        Ok(stream::iter(events).boxed())
    }

    fn status(&self) -> ChannelStatus {
        let mut busy = self.busy_polls.lock();
        if *busy > 0 {
            *busy -= 1;
            return ChannelStatus::Streaming;
        }
        *self.status.lock()
    }

    async fn stop(&self) {
        *self.stops.lock() += 1;
    }
}

// ----------------------------------------------------------------------
// Failing store
// ----------------------------------------------------------------------

/// Store whose every operation fails with `Unavailable`
#[derive(Debug, Default)]
pub struct FailingChatStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(PersistenceError::Unavailable("store offline".to_string()))
}

#[async_trait]
impl ChatStore for FailingChatStore {
    async fn get_or_create_session(&self, _form_id: &FormId) -> StoreResult<ChatSession> {
        unavailable()
    }

    async fn get_messages(&self, _session_id: &SessionId) -> StoreResult<Vec<ChatMessage>> {
        unavailable()
    }

    async fn save_message(
        &self,
        _session_id: &SessionId,
        _role: Role,
        _text: &str,
        _command_invocations: Vec<CommandInvocation>,
    ) -> StoreResult<ChatMessage> {
        unavailable()
    }

    async fn mark_applied(&self, _message_id: &MessageId) -> StoreResult<()> {
        unavailable()
    }

    async fn clear_history(&self, _form_id: &FormId) -> StoreResult<()> {
        unavailable()
    }
}

/// Parse a JSON literal into a command; panics on bad input
pub fn command(value: serde_json::Value) -> FormCommand {
    serde_json::from_value(value).expect("invalid command literal")
}
