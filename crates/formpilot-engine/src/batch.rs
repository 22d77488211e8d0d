//! Transactional batch application
//!
//! A batch is split in two phases:
//! 1. Settings commands (style, design, confirmation page) touch only their
//!    own record and commute with everything else.
//! 2. Section-tree commands are threaded, in emission order, through one
//!    working copy of the document.
//!
//! The resulting [`FormState`] is built once, after both phases, so no reader
//! ever observes half a batch.

use crate::engine::{apply_tree_command, ApplyContext, CommandOutcome, SkipReason};
use formpilot_document::{
    CommandKind, ConfirmationPageSettings, DesignSettings, ElementId, FieldUpdates, FormCommand,
    FormState, SectionId, StyleSettings,
};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// What a batch did, as far as selection and workflow care
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEffects {
    /// Every command kind present in the batch, applied or not
    pub kinds: BTreeSet<CommandKind>,
    /// A `replaceForm` ran
    pub replaced_form: bool,
    /// Elements removed, explicitly or together with their section
    pub deleted_element_ids: HashSet<ElementId>,
    /// Sections removed
    pub deleted_section_ids: HashSet<SectionId>,
    /// Successful `updateField` payloads, in application order
    pub field_updates: Vec<(ElementId, FieldUpdates)>,
}

impl BatchEffects {
    /// Whether the batch contained a command of `kind`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: CommandKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// True for an empty batch
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Result of [`BatchSequencer::apply_batch`]
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Published state
    pub state: FormState,
    /// Effects for reconciliation and workflow observation
    pub effects: BatchEffects,
    /// One outcome per input command, in input order
    pub outcomes: Vec<CommandOutcome>,
}

impl BatchOutcome {
    /// Number of commands that took effect
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    /// Skipped commands with their input index
    pub fn skipped(&self) -> impl Iterator<Item = (usize, &SkipReason)> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| match outcome {
                CommandOutcome::Skipped(reason) => Some((index, reason)),
                CommandOutcome::Applied => None,
            })
    }
}

/// Applies command batches to a form state
///
/// # Characteristics
/// - Two-phase: independent settings commands, then ordered tree commands
/// - Later tree commands see the effects of earlier ones
/// - Single publish at the end
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSequencer;

impl BatchSequencer {
    /// Create sequencer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Split a batch into settings and tree commands, keeping input indexes
    #[allow(clippy::type_complexity)]
    fn partition<'a>(
        commands: &'a [FormCommand],
    ) -> (Vec<(usize, &'a FormCommand)>, Vec<(usize, &'a FormCommand)>) {
        commands
            .iter()
            .enumerate()
            .partition(|(_, command)| command.kind().is_settings())
    }

    /// Apply `commands` to a copy of `state`
    #[must_use]
    pub fn apply_batch(
        &self,
        state: &FormState,
        commands: &[FormCommand],
        ctx: &ApplyContext,
    ) -> BatchOutcome {
        let mut effects = BatchEffects {
            kinds: commands.iter().map(FormCommand::kind).collect(),
            ..BatchEffects::default()
        };
        let mut outcomes = vec![CommandOutcome::Applied; commands.len()];
        let (settings, tree) = Self::partition(commands);

        // Phase 1: independent records
        let mut style = state.style.clone();
        let mut design = state.design.clone();
        let mut confirmation_page = state.confirmation_page.clone();
        for (index, command) in settings {
            outcomes[index] = apply_settings(command, &mut style, &mut design, &mut confirmation_page);
        }

        // Phase 2: one working document, emission order
        let mut document = state.document.clone();
        for (index, command) in tree {
            outcomes[index] = apply_tree_command(&mut document, command, ctx, &mut effects);
        }

        let outcome = BatchOutcome {
            state: FormState {
                document,
                style,
                design,
                confirmation_page,
            },
            effects,
            outcomes,
        };
        debug!(
            commands = commands.len(),
            applied = outcome.applied_count(),
            "batch applied"
        );
        outcome
    }
}

fn apply_settings(
    command: &FormCommand,
    style: &mut StyleSettings,
    design: &mut DesignSettings,
    confirmation_page: &mut ConfirmationPageSettings,
) -> CommandOutcome {
    match command {
        FormCommand::UpdateFormStyle(args) => style.clone_from(&args.style),
        FormCommand::UpdateDesignSettings(args) => design.merge(&args.settings),
        FormCommand::UpdateThankYouPage(args) => confirmation_page.merge(&args.settings),
        // partition() only routes settings commands here
        _ => return CommandOutcome::Skipped(SkipReason::SettingsCommand),
    }
    CommandOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_document::{
        AddFields, AddSection, DeleteSection, Document, ElementDraft, ElementType, Layout,
        SequentialIdSource, UpdateDesignSettings, UpdateFormStyle,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> ApplyContext {
        ApplyContext::new(Arc::new(SequentialIdSource::new()))
    }

    fn add_section(title: &str) -> FormCommand {
        FormCommand::AddSection(AddSection {
            title: title.into(),
            description: None,
            show_title: None,
            insert_after_section_id: None,
            elements: Vec::new(),
        })
    }

    #[test]
    fn later_commands_see_earlier_effects() {
        let commands = vec![
            add_section("Contact"),
            FormCommand::AddFields(AddFields {
                elements: vec![ElementDraft::new(ElementType::EmailField)],
                insert_after_field_id: None,
                section_id: Some(SectionId::new("sec-1")),
            }),
        ];
        let outcome = BatchSequencer::new().apply_batch(&FormState::default(), &commands, &ctx());

        assert_eq!(outcome.applied_count(), 2);
        let sections = outcome.state.document.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Contact");
        assert_eq!(sections[0].element_ids().count(), 1);
    }

    #[test]
    fn settings_commands_apply_independently() {
        let mut settings = formpilot_document::Attributes::new();
        settings.insert("primaryColor".into(), json!("#123456"));
        let commands = vec![
            FormCommand::UpdateDesignSettings(UpdateDesignSettings { settings }),
            FormCommand::DeleteSection(DeleteSection {
                section_id: SectionId::new("ghost"),
            }),
            FormCommand::UpdateFormStyle(UpdateFormStyle {
                style: StyleSettings {
                    layout: Layout::Stepped,
                },
            }),
        ];
        let outcome = BatchSequencer::new().apply_batch(&FormState::default(), &commands, &ctx());

        assert_eq!(outcome.state.style.layout, Layout::Stepped);
        assert_eq!(outcome.state.design.0["primaryColor"], json!("#123456"));
        assert_eq!(outcome.state.document, Document::new());

        let skipped: Vec<_> = outcome.skipped().map(|(i, _)| i).collect();
        assert_eq!(skipped, [1]);
        assert!(outcome.effects.contains(CommandKind::DeleteSection));
        assert!(outcome.effects.deleted_section_ids.is_empty());
    }

    #[test]
    fn input_state_is_untouched() {
        let state = FormState::default();
        let _ = BatchSequencer::new().apply_batch(&state, &[add_section("A")], &ctx());
        assert!(state.document.is_empty());
    }

    #[test]
    fn empty_batch_has_no_effects() {
        let outcome = BatchSequencer::new().apply_batch(&FormState::default(), &[], &ctx());
        assert!(outcome.effects.is_empty());
        assert!(outcome.outcomes.is_empty());
    }
}
