//! Guided build workflow
//!
//! The agent builds a form in a fixed pipeline:
//! `structure -> style -> design -> confirmation -> complete`.
//! The controller records the furthest stage completed so far and only ever
//! moves forward; a free-form user message restarts it.

use crate::channel::{AgentChannel, ChannelStatus};
use crate::config::IdlePollPolicy;
use crate::error::{ChannelError, CoreError};
use formpilot_document::CommandKind;
use formpilot_engine::BatchEffects;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info};

/// Pipeline stage, ordered by position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    /// Sections and fields
    Structure,
    /// Layout
    Style,
    /// Colors, fonts, spacing
    Design,
    /// Thank-you page
    Confirmation,
    /// Nothing left to do
    Complete,
}

impl WorkflowStep {
    /// Every stage, in pipeline order
    pub const ALL: [WorkflowStep; 5] = [
        Self::Structure,
        Self::Style,
        Self::Design,
        Self::Confirmation,
        Self::Complete,
    ];

    /// Stage after this one (`Complete` stays `Complete`)
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Structure => Self::Style,
            Self::Style => Self::Design,
            Self::Design => Self::Confirmation,
            Self::Confirmation | Self::Complete => Self::Complete,
        }
    }

    /// Human label used in prompts
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Structure => "form structure",
            Self::Style => "style",
            Self::Design => "design",
            Self::Confirmation => "confirmation page",
            Self::Complete => "form",
        }
    }

    /// Stage a command kind completes, if any
    #[must_use]
    pub fn completed_by(kind: CommandKind) -> Option<Self> {
        match kind {
            CommandKind::ReplaceForm | CommandKind::AddFields | CommandKind::AddSection => {
                Some(Self::Structure)
            }
            CommandKind::UpdateFormStyle => Some(Self::Style),
            CommandKind::UpdateDesignSettings => Some(Self::Design),
            CommandKind::UpdateThankYouPage => Some(Self::Confirmation),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structure => "structure",
            Self::Style => "style",
            Self::Design => "design",
            Self::Confirmation => "confirmation",
            Self::Complete => "complete",
        })
    }
}

/// Furthest stage completed by any of `kinds`
#[must_use]
pub fn stage_for_kinds(kinds: impl IntoIterator<Item = CommandKind>) -> Option<WorkflowStep> {
    kinds.into_iter().filter_map(WorkflowStep::completed_by).max()
}

/// Message asking the agent for an alternative to rejected commands
#[must_use]
pub fn denial_prompt(kinds: impl IntoIterator<Item = CommandKind>) -> String {
    match stage_for_kinds(kinds) {
        Some(stage) => format!(
            "I don't like this {}. Suggest something different.",
            stage.label()
        ),
        None => "I don't like these changes. Suggest something different.".to_string(),
    }
}

/// Forward-only workflow state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowController {
    reached: Option<WorkflowStep>,
}

impl WorkflowController {
    /// Nothing reached yet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Furthest completed stage
    #[inline]
    #[must_use]
    pub fn reached(&self) -> Option<WorkflowStep> {
        self.reached
    }

    /// Stage the agent should work on now
    #[inline]
    #[must_use]
    pub fn current_step(&self) -> WorkflowStep {
        self.reached.map_or(WorkflowStep::Structure, WorkflowStep::next)
    }

    /// Whether the pipeline is done
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current_step() == WorkflowStep::Complete
    }

    /// Record `step` as completed; returns true if that moved the state
    ///
    /// Completing an earlier stage than already reached is ignored.
    pub fn complete(&mut self, step: WorkflowStep) -> bool {
        if self.reached.is_some_and(|reached| reached >= step) {
            debug!(%step, reached = ?self.reached, "ignoring backward workflow transition");
            return false;
        }
        info!(from = %self.current_step(), completed = %step, "workflow advanced");
        self.reached = Some(step);
        true
    }

    /// Advance from a batch's command kinds; returns the new stage reached
    pub fn observe(&mut self, effects: &BatchEffects) -> Option<WorkflowStep> {
        let stage = stage_for_kinds(effects.kinds.iter().copied())?;
        self.complete(stage).then_some(stage)
    }

    /// Back to the start
    pub fn restart(&mut self) {
        if self.reached.is_some() {
            info!("workflow restarted");
        }
        self.reached = None;
    }
}

/// Wait until `channel` is idle, polling with backoff
///
/// # Errors
/// [`CoreError::ContinuationTimeout`] once the policy's bound is exceeded,
/// [`CoreError::Channel`] if the channel enters its error state.
pub async fn wait_for_idle(
    channel: &dyn AgentChannel,
    policy: &IdlePollPolicy,
) -> Result<(), CoreError> {
    let started = Instant::now();
    let deadline = policy.max_wait().map(|max| started + max);
    let mut interval = policy.initial_interval();

    loop {
        match channel.status() {
            ChannelStatus::Idle => return Ok(()),
            ChannelStatus::Error => return Err(ChannelError::ErrorStatus.into()),
            status => debug!(%status, ?interval, "channel busy, waiting"),
        }

        let now = Instant::now();
        let sleep_for = match deadline {
            Some(deadline) if now >= deadline => {
                let waited_ms = u64::try_from(now.duration_since(started).as_millis())
                    .unwrap_or(u64::MAX);
                return Err(CoreError::ContinuationTimeout { waited_ms });
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };
        tokio::time::sleep(sleep_for).await;
        interval = policy.next_interval(interval);
    }
}
