//! Form editor: one form-editing session
//!
//! [`FormEditor`] owns everything for a single form: the published
//! [`FormState`], the canvas [`Selection`], the chat history and which of its
//! messages were applied, and the workflow state. It is passed around
//! explicitly; nothing here is global, so two forms are two editors.
//!
//! # Flow
//! 1. `send_message` runs an agent turn and stores the reply with its
//!    command invocations
//! 2. The user confirms a reply with `mark_message_applied`, which applies
//!    its commands as one batch and advances the workflow
//! 3. `continue_workflow` waits for the channel and asks for the next stage
//!
//! Persistence is best-effort: store failures are logged and the in-memory
//! state stays authoritative.

use crate::channel::{AgentChannel, ChannelStatus};
use crate::config::EditorConfig;
use crate::error::{ChannelError, CoreError, CoreResult};
use crate::store::ChatStore;
use crate::turn::collect_turn;
use crate::types::{ChatMessage, ChatSession, FormId, MessageId, Role};
use crate::workflow::{denial_prompt, wait_for_idle, WorkflowController, WorkflowStep};
use formpilot_document::{
    decode_all, CommandInvocation, Document, ElementId, FormCommand, FormState, IdSource,
    SectionId, UuidIdSource,
};
use formpilot_engine::{ApplyContext, BatchOutcome, BatchSequencer, CommandOutcome, Selection};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What confirming a message did
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    /// Confirmed message
    pub message_id: MessageId,
    /// The message had been applied before; nothing was done
    pub already_applied: bool,
    /// One outcome per decoded command
    pub outcomes: Vec<CommandOutcome>,
    /// Invocations that could not be decoded, as `(index, reason)`
    pub rejected: Vec<(usize, String)>,
    /// Workflow stage newly reached by this batch
    pub advanced_to: Option<WorkflowStep>,
    /// A continuation was sent because of `auto_continue`
    pub continued: bool,
}

impl ApplyReport {
    fn already_applied(message_id: MessageId) -> Self {
        Self {
            message_id,
            already_applied: true,
            outcomes: Vec::new(),
            rejected: Vec::new(),
            advanced_to: None,
            continued: false,
        }
    }
}

/// Application state for one form
pub struct FormEditor {
    form_id: FormId,
    state: FormState,
    selection: Selection,
    session: ChatSession,
    messages: Vec<ChatMessage>,
    applied: BTreeSet<MessageId>,
    workflow: WorkflowController,
    channel_error: Option<ChannelError>,
    channel: Arc<dyn AgentChannel>,
    store: Arc<dyn ChatStore>,
    config: EditorConfig,
    ids: Arc<dyn IdSource>,
    sequencer: BatchSequencer,
}

impl fmt::Debug for FormEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormEditor")
            .field("form_id", &self.form_id)
            .field("session", &self.session.id)
            .field("messages", &self.messages.len())
            .field("applied", &self.applied.len())
            .field("workflow", &self.workflow)
            .field("channel", &"<channel>")
            .field("store", &"<store>")
            .finish_non_exhaustive()
    }
}

impl FormEditor {
    /// Open an editing session for `form_id`
    ///
    /// Loads the chat history and seeds the applied set from the persisted
    /// flags, so nothing is offered or applied twice after a reload. A store
    /// that cannot be reached degrades to a fresh local session.
    ///
    /// # Errors
    /// [`CoreError::Config`] if `config` is invalid,
    /// [`CoreError::InvalidDocument`] if `state` breaks a document invariant.
    pub async fn open(
        form_id: FormId,
        state: FormState,
        channel: Arc<dyn AgentChannel>,
        store: Arc<dyn ChatStore>,
        config: EditorConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        state.document.check_invariants()?;

        let session = match store.get_or_create_session(&form_id).await {
            Ok(session) => session,
            Err(err) => {
                warn!(form = %form_id, error = %err, "chat store unavailable, using a local session");
                ChatSession::new(form_id.clone())
            }
        };
        let messages = match store.get_messages(&session.id).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(session = %session.id, error = %err, "failed to load chat history");
                Vec::new()
            }
        };
        let applied: BTreeSet<MessageId> =
            messages.iter().filter(|m| m.applied).map(|m| m.id).collect();

        info!(
            form = %form_id,
            session = %session.id,
            messages = messages.len(),
            applied = applied.len(),
            "form editor opened"
        );

        Ok(Self {
            form_id,
            state,
            selection: Selection::new(),
            session,
            messages,
            applied,
            workflow: WorkflowController::new(),
            channel_error: None,
            channel,
            store,
            config,
            ids: Arc::new(UuidIdSource),
            sequencer: BatchSequencer::new(),
        })
    }

    /// Use a specific id generator for new nodes
    #[must_use]
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    // ------------------------------------------------------------------
    // Document
    // ------------------------------------------------------------------

    /// Apply one command (as a one-command batch)
    pub fn apply_command(&mut self, command: FormCommand) -> BatchOutcome {
        self.apply_batch(std::slice::from_ref(&command))
    }

    /// Apply a batch: engine, selection reconciliation, workflow observation,
    /// then a single publish
    pub fn apply_batch(&mut self, commands: &[FormCommand]) -> BatchOutcome {
        self.commit(commands).0
    }

    fn apply_context(&self) -> ApplyContext {
        ApplyContext::new(Arc::clone(&self.ids))
            .with_current_section(self.selection.selected_section_id().cloned())
            .with_default_section_title(self.config.default_section_title.clone())
    }

    fn commit(&mut self, commands: &[FormCommand]) -> (BatchOutcome, Option<WorkflowStep>) {
        let outcome = self
            .sequencer
            .apply_batch(&self.state, commands, &self.apply_context());
        self.selection
            .reconcile(&outcome.effects, &outcome.state.document);
        self.state = outcome.state.clone();
        let advanced = self.workflow.observe(&outcome.effects);
        (outcome, advanced)
    }

    /// Select an element; false if it is not in the document
    pub fn select_element(&mut self, id: &ElementId) -> bool {
        self.selection.select_element(&self.state.document, id)
    }

    /// Select a section; false if it is not in the document
    pub fn select_section(&mut self, id: &SectionId) -> bool {
        self.selection.select_section(&self.state.document, id)
    }

    // ------------------------------------------------------------------
    // Conversation
    // ------------------------------------------------------------------

    /// Send a free-form user message
    ///
    /// Restarts the workflow at `structure`. Returns the stored assistant
    /// reply, or `None` if the turn was cancelled before producing anything.
    ///
    /// # Errors
    /// [`CoreError::ChannelBusy`] while a turn is in flight;
    /// [`CoreError::Channel`] if the turn fails.
    pub async fn send_message(&mut self, text: &str) -> CoreResult<Option<ChatMessage>> {
        self.ensure_ready()?;
        self.workflow.restart();
        self.run_turn(text).await
    }

    /// Mark `completed` done and ask the agent for the next stage
    ///
    /// Waits (bounded) for the channel to become idle first. Does nothing
    /// once the workflow is complete.
    ///
    /// # Errors
    /// [`CoreError::ContinuationTimeout`] if the channel stays busy,
    /// [`CoreError::Channel`] if it errors.
    pub async fn continue_workflow(
        &mut self,
        completed: WorkflowStep,
    ) -> CoreResult<Option<ChatMessage>> {
        self.workflow.complete(completed);
        if self.workflow.is_complete() {
            debug!("workflow complete, no continuation");
            return Ok(None);
        }

        if let Err(err) = wait_for_idle(self.channel.as_ref(), &self.config.idle_poll).await {
            if let CoreError::Channel(channel_err) = &err {
                self.channel_error = Some(channel_err.clone());
            }
            warn!(error = %err, step = %self.workflow.current_step(), "continuation abandoned");
            return Err(err);
        }

        let prompt = self.config.continue_prompt.clone();
        self.run_turn(&prompt).await
    }

    /// Reject a message's commands and ask for an alternative
    ///
    /// Nothing is rolled back and the workflow does not move.
    ///
    /// # Errors
    /// As [`FormEditor::send_message`].
    pub async fn deny_changes(
        &mut self,
        message_id: MessageId,
        commands: &[FormCommand],
    ) -> CoreResult<Option<ChatMessage>> {
        self.ensure_ready()?;
        let prompt = denial_prompt(commands.iter().map(FormCommand::kind));
        info!(%message_id, "changes denied");
        self.run_turn(&prompt).await
    }

    /// Confirm a message: apply its commands once
    ///
    /// Idempotent: a message already applied (in this session or a previous
    /// one) is reported as such and nothing is re-applied.
    ///
    /// # Errors
    /// [`CoreError::UnknownMessage`] if the id is not in this session.
    pub async fn mark_message_applied(&mut self, message_id: MessageId) -> CoreResult<ApplyReport> {
        if self.applied.contains(&message_id) {
            debug!(%message_id, "message already applied");
            return Ok(ApplyReport::already_applied(message_id));
        }
        let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) else {
            return Err(CoreError::UnknownMessage(message_id));
        };
        message.mark_applied();
        let (commands, failures) = decode_all(&message.command_invocations);

        for (index, err) in &failures {
            warn!(%message_id, index, error = %err, "dropping undecodable invocation");
        }

        let (outcome, advanced_to) = self.commit(&commands);
        self.applied.insert(message_id);
        if let Err(err) = self.store.mark_applied(&message_id).await {
            warn!(%message_id, error = %err, "failed to persist applied flag");
        }
        info!(
            %message_id,
            commands = commands.len(),
            applied = outcome.applied_count(),
            "message applied"
        );

        let mut report = ApplyReport {
            message_id,
            already_applied: false,
            outcomes: outcome.outcomes,
            rejected: failures
                .into_iter()
                .map(|(index, err)| (index, err.to_string()))
                .collect(),
            advanced_to,
            continued: false,
        };

        if let (true, Some(step)) = (self.config.auto_continue, advanced_to) {
            match self.continue_workflow(step).await {
                Ok(reply) => report.continued = reply.is_some(),
                Err(err) => warn!(error = %err, "auto-continue failed"),
            }
        }
        Ok(report)
    }

    /// Ask the channel to stop
    ///
    /// This borrows the editor, so it cannot run while `send_message` or
    /// `continue_workflow` holds it. To cancel a turn in flight, stop the
    /// handle from [`FormEditor::channel`] on another task.
    pub async fn stop(&self) {
        self.channel.stop().await;
    }

    /// Shared handle to the agent channel
    ///
    /// Calling [`AgentChannel::stop`] on it ends the running turn; the reply
    /// keeps the invocations that completed before the cancellation.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Arc<dyn AgentChannel> {
        Arc::clone(&self.channel)
    }

    /// Forget the conversation (locally and, best-effort, in the store)
    pub async fn clear_history(&mut self) {
        if let Err(err) = self.store.clear_history(&self.form_id).await {
            warn!(form = %self.form_id, error = %err, "failed to clear stored history");
        }
        self.messages.clear();
        self.applied.clear();
        self.channel_error = None;
        self.workflow.restart();
    }

    fn ensure_ready(&self) -> CoreResult<()> {
        match self.channel.status() {
            // An errored channel accepts a fresh user message; nothing retries on its own.
            ChannelStatus::Idle | ChannelStatus::Error => Ok(()),
            status => Err(CoreError::ChannelBusy(status)),
        }
    }

    async fn run_turn(&mut self, text: &str) -> CoreResult<Option<ChatMessage>> {
        self.channel_error = None;
        self.record_message(Role::User, text, Vec::new()).await;

        let turn = match self.channel.send(text).await {
            Ok(stream) => collect_turn(stream).await,
            Err(err) => Err(err),
        };
        let turn = turn.map_err(|err| self.channel_failed(err))?;

        if turn.interrupted {
            debug!(
                invocations = turn.invocations.len(),
                "turn interrupted, keeping complete invocations only"
            );
            if turn.text.is_empty() && turn.invocations.is_empty() {
                return Ok(None);
            }
        }
        let reply = self
            .record_message(Role::Assistant, &turn.text, turn.invocations)
            .await;
        Ok(Some(reply))
    }

    fn channel_failed(&mut self, err: ChannelError) -> CoreError {
        error!(error = %err, "agent turn failed");
        self.channel_error = Some(err.clone());
        CoreError::Channel(err)
    }

    async fn record_message(
        &mut self,
        role: Role,
        text: &str,
        invocations: Vec<CommandInvocation>,
    ) -> ChatMessage {
        let message = match self
            .store
            .save_message(&self.session.id, role, text, invocations.clone())
            .await
        {
            Ok(message) => message,
            Err(err) => {
                warn!(session = %self.session.id, %role, error = %err, "failed to persist message");
                ChatMessage::new(self.session.id, role, text, invocations)
            }
        };
        self.messages.push(message.clone());
        message
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Form being edited
    #[inline]
    #[must_use]
    pub fn form_id(&self) -> &FormId {
        &self.form_id
    }

    /// Chat session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Published form state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Published document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.state.document
    }

    /// Canvas selection
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Chat history, oldest first
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Ids of messages whose commands were applied
    #[inline]
    #[must_use]
    pub fn applied_message_ids(&self) -> &BTreeSet<MessageId> {
        &self.applied
    }

    /// Whether a message was applied
    #[inline]
    #[must_use]
    pub fn is_applied(&self, message_id: &MessageId) -> bool {
        self.applied.contains(message_id)
    }

    /// Assistant messages with commands still awaiting confirmation
    pub fn pending_confirmations(&self) -> impl Iterator<Item = &ChatMessage> + '_ {
        self.messages.iter().filter(|m| {
            m.role == Role::Assistant && m.has_commands() && !self.applied.contains(&m.id)
        })
    }

    /// Stage the agent is working on
    #[inline]
    #[must_use]
    pub fn workflow_step(&self) -> WorkflowStep {
        self.workflow.current_step()
    }

    /// Workflow state machine
    #[inline]
    #[must_use]
    pub fn workflow(&self) -> &WorkflowController {
        &self.workflow
    }

    /// Error from the last agent turn, if it failed
    #[inline]
    #[must_use]
    pub fn channel_error(&self) -> Option<&ChannelError> {
        self.channel_error.as_ref()
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
}
