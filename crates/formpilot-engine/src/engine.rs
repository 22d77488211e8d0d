//! Single-command application
//!
//! [`apply_command`] never mutates its input. It clones the document (O(1)
//! thanks to persistent vectors), edits the copy and hands it back together
//! with a [`CommandOutcome`]. Reference errors and capacity violations are
//! outcomes, not errors: the copy comes back untouched.

use crate::batch::BatchEffects;
use formpilot_document::{
    AddElementToRow, AddFields, AddSection, DeleteFields, DeleteSection, Document, Element,
    ElementDraft, ElementId, FormCommand, IdSource, ReorderFields, ReorderSections, ReplaceForm,
    Row, RowId, Section, SectionId, UpdateField, UpdateSection, UuidIdSource,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Title of the section created when elements arrive for an empty document
pub const DEFAULT_SECTION_TITLE: &str = "Section 1";

/// Everything a command needs besides the document itself
#[derive(Debug, Clone)]
pub struct ApplyContext {
    current_section: Option<SectionId>,
    default_section_title: String,
    ids: Arc<dyn IdSource>,
}

impl ApplyContext {
    /// Context drawing fresh ids from `ids`
    #[must_use]
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        Self {
            current_section: None,
            default_section_title: DEFAULT_SECTION_TITLE.to_string(),
            ids,
        }
    }

    /// Section that receives appended elements when a command names none
    #[must_use]
    pub fn with_current_section(mut self, section: Option<SectionId>) -> Self {
        self.current_section = section;
        self
    }

    /// Title of an auto-created section
    #[must_use]
    pub fn with_default_section_title(mut self, title: impl Into<String>) -> Self {
        self.default_section_title = title.into();
        self
    }

    /// Current target section
    #[inline]
    #[must_use]
    pub fn current_section(&self) -> Option<&SectionId> {
        self.current_section.as_ref()
    }

    /// Title of an auto-created section
    #[inline]
    #[must_use]
    pub fn default_section_title(&self) -> &str {
        &self.default_section_title
    }

    /// Id generator
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &dyn IdSource {
        self.ids.as_ref()
    }
}

impl Default for ApplyContext {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdSource))
    }
}

/// Why a command left the document untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Named element does not exist
    UnknownElement(ElementId),
    /// Named section does not exist
    UnknownSection(SectionId),
    /// None of the ids to delete exist
    NoMatchingElements,
    /// Target row already holds two elements
    RowFull(RowId),
    /// Every element carried an id already in the document
    DuplicateElementId(ElementId),
    /// Command carried no element at all
    NoElements,
    /// Style/design/confirmation command; it never touches the tree
    SettingsCommand,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement(id) => write!(f, "unknown element {id}"),
            Self::UnknownSection(id) => write!(f, "unknown section {id}"),
            Self::NoMatchingElements => f.write_str("no matching elements"),
            Self::RowFull(id) => write!(f, "row {id} is full"),
            Self::DuplicateElementId(id) => write!(f, "element {id} already exists"),
            Self::NoElements => f.write_str("no elements given"),
            Self::SettingsCommand => f.write_str("settings command"),
        }
    }
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandOutcome {
    /// The command took effect
    Applied,
    /// The command was a no-op
    Skipped(SkipReason),
}

impl CommandOutcome {
    /// True for [`CommandOutcome::Applied`]
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// New document plus what happened
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Resulting document; equal to the input when skipped
    pub document: Document,
    /// Outcome
    pub outcome: CommandOutcome,
}

/// Apply one section-tree command to a copy of `document`
///
/// Settings commands come back as [`SkipReason::SettingsCommand`]; apply
/// them through [`crate::BatchSequencer`] which owns the settings records.
#[must_use]
pub fn apply_command(document: &Document, command: &FormCommand, ctx: &ApplyContext) -> Applied {
    let mut working = document.clone();
    let mut effects = BatchEffects::default();
    let outcome = apply_tree_command(&mut working, command, ctx, &mut effects);
    Applied {
        document: working,
        outcome,
    }
}

/// Apply in place to a working copy, recording effects
pub(crate) fn apply_tree_command(
    doc: &mut Document,
    command: &FormCommand,
    ctx: &ApplyContext,
    effects: &mut BatchEffects,
) -> CommandOutcome {
    let outcome = match command {
        FormCommand::AddFields(args) => add_fields(doc, args, ctx),
        FormCommand::DeleteFields(args) => delete_fields(doc, args, effects),
        FormCommand::UpdateField(args) => update_field(doc, args, effects),
        FormCommand::ReorderFields(args) => reorder_fields(doc, args, ctx),
        FormCommand::ReplaceForm(args) => replace_form(doc, args, ctx, effects),
        FormCommand::AddSection(args) => add_section(doc, args, ctx),
        FormCommand::UpdateSection(args) => update_section(doc, args),
        FormCommand::DeleteSection(args) => delete_section(doc, args, effects),
        FormCommand::ReorderSections(args) => reorder_sections(doc, args),
        FormCommand::AddElementToRow(args) => add_element_to_row(doc, args, ctx),
        FormCommand::UpdateFormStyle(_)
        | FormCommand::UpdateDesignSettings(_)
        | FormCommand::UpdateThankYouPage(_) => CommandOutcome::Skipped(SkipReason::SettingsCommand),
    };

    if let CommandOutcome::Skipped(reason) = &outcome {
        debug!(command = %command.kind(), %reason, "command skipped");
    }
    outcome
}

/// Materialize drafts, dropping any whose explicit id is already taken
///
/// Returns the usable elements and the rejected ids.
fn fresh_elements(
    drafts: &[ElementDraft],
    doc: &Document,
    ids: &dyn IdSource,
) -> (Vec<Element>, Vec<ElementId>) {
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut elements = Vec::with_capacity(drafts.len());
    let mut duplicates = Vec::new();

    for draft in drafts {
        let taken = |id: &ElementId| doc.contains_element(id) || seen.contains(id);
        let id = match &draft.id {
            Some(id) if taken(id) => {
                duplicates.push(id.clone());
                continue;
            }
            Some(id) => id.clone(),
            None => {
                let mut id = ids.element_id();
                while taken(&id) {
                    id = ids.element_id();
                }
                id
            }
        };
        seen.insert(id.clone());
        elements.push(draft.clone().with_id(id).into_element(ids));
    }

    if !duplicates.is_empty() {
        debug!(count = duplicates.len(), "dropped drafts with existing ids");
    }
    (elements, duplicates)
}

fn fresh_section_id(doc: &Document, ids: &dyn IdSource) -> SectionId {
    let mut id = ids.section_id();
    while doc.section(&id).is_some() {
        id = ids.section_id();
    }
    id
}

fn single_rows(elements: Vec<Element>, ids: &dyn IdSource) -> Vec<Row> {
    elements
        .into_iter()
        .map(|element| Row::single(ids.row_id(), element))
        .collect()
}

/// Nothing usable came out of the drafts
fn empty_drafts_reason(duplicates: Vec<ElementId>) -> SkipReason {
    duplicates
        .into_iter()
        .next()
        .map_or(SkipReason::NoElements, SkipReason::DuplicateElementId)
}

/// Where appended elements go: named section, then current, then first
fn append_target(doc: &Document, named: Option<&SectionId>, ctx: &ApplyContext) -> Option<usize> {
    named
        .and_then(|id| doc.section_index(id))
        .or_else(|| ctx.current_section().and_then(|id| doc.section_index(id)))
        .or_else(|| (!doc.is_empty()).then_some(0))
}

fn add_fields(doc: &mut Document, args: &AddFields, ctx: &ApplyContext) -> CommandOutcome {
    let ids = ctx.ids();
    let (elements, duplicates) = fresh_elements(&args.elements, doc, ids);
    if elements.is_empty() {
        return CommandOutcome::Skipped(empty_drafts_reason(duplicates));
    }
    let rows = single_rows(elements, ids);

    if let Some(anchor) = &args.insert_after_field_id {
        if let Some(loc) = doc.locate_element(anchor) {
            let section = &mut doc.sections_mut()[loc.section];
            for (offset, row) in rows.into_iter().enumerate() {
                section.rows.insert(loc.row + 1 + offset, row);
            }
            return CommandOutcome::Applied;
        }
        debug!(anchor = %anchor, "insert anchor not found, appending");
    }

    let index = match append_target(doc, args.section_id.as_ref(), ctx) {
        Some(index) => index,
        None => {
            let section = Section::new(fresh_section_id(doc, ids), ctx.default_section_title());
            doc.sections_mut().push_back(section);
            doc.sections().len() - 1
        }
    };
    doc.sections_mut()[index].rows.extend(rows);
    CommandOutcome::Applied
}

fn delete_fields(doc: &mut Document, args: &DeleteFields, effects: &mut BatchEffects) -> CommandOutcome {
    let targets: HashSet<&ElementId> = args.field_ids.iter().collect();
    let mut removed = Vec::new();

    // Index loops: only sections and rows that actually change get copied.
    for s in 0..doc.sections().len() {
        if !doc.sections()[s].elements().any(|e| targets.contains(&e.id)) {
            continue;
        }
        let section = &mut doc.sections_mut()[s];
        for r in 0..section.rows.len() {
            if !section.rows[r].elements().iter().any(|e| targets.contains(&e.id)) {
                continue;
            }
            section.rows[r].retain(|e| {
                let hit = targets.contains(&e.id);
                if hit {
                    removed.push(e.id.clone());
                }
                !hit
            });
        }
        section.prune_empty_rows();
    }

    if removed.is_empty() {
        return CommandOutcome::Skipped(SkipReason::NoMatchingElements);
    }
    effects.deleted_element_ids.extend(removed);
    CommandOutcome::Applied
}

fn update_field(doc: &mut Document, args: &UpdateField, effects: &mut BatchEffects) -> CommandOutcome {
    let Some(loc) = doc.locate_element(&args.field_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownElement(args.field_id.clone()));
    };
    let row = &mut doc.sections_mut()[loc.section].rows[loc.row];
    let Some(element) = row.element_mut(&args.field_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownElement(args.field_id.clone()));
    };
    element.apply_updates(&args.updates);
    effects
        .field_updates
        .push((args.field_id.clone(), args.updates.clone()));
    CommandOutcome::Applied
}

/// Pull items out of `pool` in `order`, then append whatever was left unnamed
///
/// Unknown ids are ignored and repeated ids are taken once.
fn reorder_by<T, K, Q>(pool: Vec<T>, order: &[K], key: impl Fn(&T) -> &Q) -> Vec<T>
where
    K: std::borrow::Borrow<Q>,
    Q: PartialEq + ?Sized,
{
    let mut slots: Vec<Option<T>> = pool.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());

    for wanted in order {
        let wanted = wanted.borrow();
        if let Some(slot) = slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|item| key(item) == wanted))
        {
            ordered.extend(slot.take());
        }
    }
    ordered.extend(slots.into_iter().flatten());
    ordered
}

fn reorder_fields(doc: &mut Document, args: &ReorderFields, ctx: &ApplyContext) -> CommandOutcome {
    let Some(index) = doc.section_index(&args.section_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownSection(args.section_id.clone()));
    };
    let section = &mut doc.sections_mut()[index];

    let mut pool: Vec<(RowId, Element)> = Vec::new();
    for row in std::mem::take(&mut section.rows) {
        let row_id = row.id.clone();
        pool.extend(row.into_elements().into_iter().map(|e| (row_id.clone(), e)));
    }

    let ordered = reorder_by(pool, &args.field_ids, |(_, element)| &element.id);

    // A row that used to pair two elements keeps its id for the first of them.
    let mut reused: HashSet<RowId> = HashSet::new();
    section.rows = ordered
        .into_iter()
        .map(|(row_id, element)| {
            let id = if reused.insert(row_id.clone()) {
                row_id
            } else {
                ctx.ids().row_id()
            };
            Row::single(id, element)
        })
        .collect();
    CommandOutcome::Applied
}

fn replace_form(
    doc: &mut Document,
    args: &ReplaceForm,
    ctx: &ApplyContext,
    effects: &mut BatchEffects,
) -> CommandOutcome {
    let ids = ctx.ids();
    let mut next = Document::new();

    for draft in &args.sections {
        let id = match &draft.id {
            Some(id) if next.section(id).is_none() => id.clone(),
            _ => fresh_section_id(&next, ids),
        };
        let mut section = Section::new(id, draft.title.clone());
        section.description.clone_from(&draft.description);
        section.show_title = draft.show_title;

        let (elements, _) = fresh_elements(&draft.elements, &next, ids);
        section.rows = single_rows(elements, ids).into_iter().collect();
        next.sections_mut().push_back(section);
    }

    effects
        .deleted_element_ids
        .extend(doc.element_ids().filter(|id| !next.contains_element(id)).cloned());
    effects.deleted_section_ids.extend(
        doc.sections()
            .iter()
            .filter(|s| next.section(&s.id).is_none())
            .map(|s| s.id.clone()),
    );
    effects.replaced_form = true;
    *doc = next;
    CommandOutcome::Applied
}

fn add_section(doc: &mut Document, args: &AddSection, ctx: &ApplyContext) -> CommandOutcome {
    let ids = ctx.ids();
    let mut section = Section::new(fresh_section_id(doc, ids), args.title.clone());
    section.description.clone_from(&args.description);
    section.show_title = args.show_title;

    let (elements, _) = fresh_elements(&args.elements, doc, ids);
    section.rows = single_rows(elements, ids).into_iter().collect();

    let after = args
        .insert_after_section_id
        .as_ref()
        .and_then(|id| doc.section_index(id));
    if after.is_none() {
        if let Some(id) = &args.insert_after_section_id {
            debug!(section = %id, "insert-after section not found, appending");
        }
    }
    let at = after.map_or(doc.sections().len(), |index| index + 1);
    doc.sections_mut().insert(at, section);
    CommandOutcome::Applied
}

fn update_section(doc: &mut Document, args: &UpdateSection) -> CommandOutcome {
    let Some(index) = doc.section_index(&args.section_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownSection(args.section_id.clone()));
    };
    let section = &mut doc.sections_mut()[index];
    let updates = &args.updates;

    if let Some(title) = &updates.title {
        section.title.clone_from(title);
    }
    if let Some(description) = &updates.description {
        section.description = Some(description.clone());
    }
    if let Some(show_title) = updates.show_title {
        section.show_title = Some(show_title);
    }
    CommandOutcome::Applied
}

fn delete_section(doc: &mut Document, args: &DeleteSection, effects: &mut BatchEffects) -> CommandOutcome {
    let Some(index) = doc.section_index(&args.section_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownSection(args.section_id.clone()));
    };
    let section = doc.sections_mut().remove(index);
    effects
        .deleted_element_ids
        .extend(section.element_ids().cloned());
    effects.deleted_section_ids.insert(section.id);
    CommandOutcome::Applied
}

fn reorder_sections(doc: &mut Document, args: &ReorderSections) -> CommandOutcome {
    let pool: Vec<Section> = std::mem::take(doc.sections_mut()).into_iter().collect();
    let ordered = reorder_by(pool, &args.section_ids, |section| &section.id);
    *doc = Document::from_sections(ordered);
    CommandOutcome::Applied
}

fn add_element_to_row(doc: &mut Document, args: &AddElementToRow, ctx: &ApplyContext) -> CommandOutcome {
    let Some(s) = doc.section_index(&args.section_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownSection(args.section_id.clone()));
    };
    let Some(r) = doc.sections()[s].row_index_of(&args.target_element_id) else {
        return CommandOutcome::Skipped(SkipReason::UnknownElement(args.target_element_id.clone()));
    };
    let row = &doc.sections()[s].rows[r];
    if row.is_full() {
        return CommandOutcome::Skipped(SkipReason::RowFull(row.id.clone()));
    }

    let (mut elements, duplicates) =
        fresh_elements(std::slice::from_ref(&args.element), doc, ctx.ids());
    let Some(element) = elements.pop() else {
        return CommandOutcome::Skipped(empty_drafts_reason(duplicates));
    };

    let row = &mut doc.sections_mut()[s].rows[r];
    match row.insert_beside(&args.target_element_id, args.position, element) {
        Ok(()) => CommandOutcome::Applied,
        Err(_) => CommandOutcome::Skipped(SkipReason::RowFull(row.id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_document::{
        ElementType, FieldUpdates, SectionUpdates, SequentialIdSource, Side,
    };
    use pretty_assertions::assert_eq;

    fn ctx() -> ApplyContext {
        ApplyContext::new(Arc::new(SequentialIdSource::new()))
    }

    fn field(id: &str) -> Element {
        Element::new(id, ElementType::TextField)
    }

    fn draft(id: &str) -> ElementDraft {
        ElementDraft::new(ElementType::TextField).with_id(id)
    }

    fn pair_doc() -> Document {
        Document::from_sections([Section::new("s1", "One").with_row(
            Row::with_elements(RowId::new("r1"), vec![field("a"), field("b")]).unwrap(),
        )])
    }

    fn ids_of(section: &Section) -> Vec<&str> {
        section.element_ids().map(ElementId::as_str).collect()
    }

    #[test]
    fn add_fields_to_empty_document_creates_default_section() {
        let applied = apply_command(
            &Document::new(),
            &FormCommand::AddFields(AddFields {
                elements: vec![ElementDraft::new(ElementType::TextField)],
                insert_after_field_id: None,
                section_id: None,
            }),
            &ctx(),
        );

        assert!(applied.outcome.is_applied());
        let sections = applied.document.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, DEFAULT_SECTION_TITLE);
        assert_eq!(sections[0].rows.len(), 1);
    }

    #[test]
    fn add_fields_after_anchor_inserts_rows_in_order() {
        let doc = Document::from_sections([Section::new("s1", "One")
            .with_row(Row::single(RowId::new("r1"), field("a")))
            .with_row(Row::single(RowId::new("r2"), field("z")))]);

        let applied = apply_command(
            &doc,
            &FormCommand::AddFields(AddFields {
                elements: vec![draft("b"), draft("c")],
                insert_after_field_id: Some(ElementId::new("a")),
                section_id: None,
            }),
            &ctx(),
        );

        assert_eq!(ids_of(&applied.document.sections()[0]), ["a", "b", "c", "z"]);
        assert!(applied.document.sections()[0].rows.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn add_fields_with_unknown_anchor_appends_to_current_section() {
        let doc = Document::from_sections([
            Section::new("s1", "One").with_row(Row::single(RowId::new("r1"), field("a"))),
            Section::new("s2", "Two"),
        ]);
        let ctx = ctx().with_current_section(Some(SectionId::new("s2")));

        let applied = apply_command(
            &doc,
            &FormCommand::AddFields(AddFields {
                elements: vec![draft("b")],
                insert_after_field_id: Some(ElementId::new("ghost")),
                section_id: None,
            }),
            &ctx,
        );

        assert_eq!(ids_of(&applied.document.sections()[1]), ["b"]);
    }

    #[test]
    fn add_fields_skips_existing_ids() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::AddFields(AddFields {
                elements: vec![draft("a")],
                insert_after_field_id: None,
                section_id: None,
            }),
            &ctx(),
        );

        assert_eq!(
            applied.outcome,
            CommandOutcome::Skipped(SkipReason::DuplicateElementId(ElementId::new("a")))
        );
        assert_eq!(applied.document, pair_doc());
    }

    #[test]
    fn delete_keeps_row_with_remaining_element() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::DeleteFields(DeleteFields {
                field_ids: vec![ElementId::new("a")],
            }),
            &ctx(),
        );

        let section = &applied.document.sections()[0];
        assert_eq!(section.rows.len(), 1);
        assert_eq!(ids_of(section), ["b"]);
    }

    #[test]
    fn delete_prunes_emptied_rows() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::DeleteFields(DeleteFields {
                field_ids: vec![ElementId::new("a"), ElementId::new("b")],
            }),
            &ctx(),
        );
        assert!(applied.document.sections()[0].rows.is_empty());
    }

    #[test]
    fn delete_unknown_is_noop() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::DeleteFields(DeleteFields {
                field_ids: vec![ElementId::new("ghost")],
            }),
            &ctx(),
        );
        assert_eq!(
            applied.outcome,
            CommandOutcome::Skipped(SkipReason::NoMatchingElements)
        );
        assert_eq!(applied.document, pair_doc());
    }

    #[test]
    fn update_field_replaces_type() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::UpdateField(UpdateField {
                field_id: ElementId::new("b"),
                updates: FieldUpdates {
                    element_type: Some(ElementType::NumberField),
                    extra_attributes: None,
                },
            }),
            &ctx(),
        );
        assert_eq!(
            applied.document.element(&ElementId::new("b")).map(|e| e.element_type),
            Some(ElementType::NumberField)
        );
    }

    #[test]
    fn reorder_fields_splits_pairs_and_appends_unlisted() {
        let doc = Document::from_sections([Section::new("s1", "One")
            .with_row(Row::with_elements(RowId::new("r1"), vec![field("a"), field("b")]).unwrap())
            .with_row(Row::single(RowId::new("r2"), field("c")))]);

        let applied = apply_command(
            &doc,
            &FormCommand::ReorderFields(ReorderFields {
                section_id: SectionId::new("s1"),
                field_ids: vec![ElementId::new("c"), ElementId::new("ghost"), ElementId::new("c")],
            }),
            &ctx(),
        );

        let section = &applied.document.sections()[0];
        assert_eq!(ids_of(section), ["c", "a", "b"]);
        assert_eq!(section.rows.len(), 3);
        assert_eq!(section.rows[0].id, RowId::new("r2"));
        assert_eq!(section.rows[1].id, RowId::new("r1"));
    }

    #[test]
    fn add_section_after_named_section() {
        let doc = Document::from_sections([Section::new("s1", "One"), Section::new("s2", "Two")]);
        let applied = apply_command(
            &doc,
            &FormCommand::AddSection(AddSection {
                title: "Middle".into(),
                description: None,
                show_title: Some(false),
                insert_after_section_id: Some(SectionId::new("s1")),
                elements: vec![draft("x")],
            }),
            &ctx(),
        );

        let titles: Vec<_> = applied.document.sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["One", "Middle", "Two"]);
        assert_eq!(applied.document.sections()[1].show_title, Some(false));
    }

    #[test]
    fn update_section_merges_only_given_fields() {
        let mut section = Section::new("s1", "One");
        section.description = Some("keep me".into());
        let applied = apply_command(
            &Document::from_sections([section]),
            &FormCommand::UpdateSection(UpdateSection {
                section_id: SectionId::new("s1"),
                updates: SectionUpdates {
                    title: Some("Renamed".into()),
                    ..SectionUpdates::default()
                },
            }),
            &ctx(),
        );

        let section = &applied.document.sections()[0];
        assert_eq!(section.title, "Renamed");
        assert_eq!(section.description.as_deref(), Some("keep me"));
    }

    #[test]
    fn reorder_sections_preserves_unlisted() {
        let doc = Document::from_sections([
            Section::new("a", "A"),
            Section::new("b", "B"),
            Section::new("c", "C"),
        ]);
        let applied = apply_command(
            &doc,
            &FormCommand::ReorderSections(ReorderSections {
                section_ids: vec![SectionId::new("c")],
            }),
            &ctx(),
        );
        let order: Vec<_> = applied.document.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn add_element_to_full_row_is_noop() {
        let applied = apply_command(
            &pair_doc(),
            &FormCommand::AddElementToRow(AddElementToRow {
                section_id: SectionId::new("s1"),
                target_element_id: ElementId::new("a"),
                position: Side::Right,
                element: draft("c"),
            }),
            &ctx(),
        );
        assert_eq!(
            applied.outcome,
            CommandOutcome::Skipped(SkipReason::RowFull(RowId::new("r1")))
        );
        assert_eq!(applied.document, pair_doc());
    }

    #[test]
    fn add_element_to_row_places_on_left() {
        let doc = Document::from_sections([
            Section::new("s1", "One").with_row(Row::single(RowId::new("r1"), field("a")))
        ]);
        let applied = apply_command(
            &doc,
            &FormCommand::AddElementToRow(AddElementToRow {
                section_id: SectionId::new("s1"),
                target_element_id: ElementId::new("a"),
                position: Side::Left,
                element: draft("b"),
            }),
            &ctx(),
        );
        assert_eq!(ids_of(&applied.document.sections()[0]), ["b", "a"]);
    }

    #[test]
    fn settings_commands_do_not_touch_the_tree() {
        let command = FormCommand::UpdateFormStyle(formpilot_document::UpdateFormStyle {
            style: formpilot_document::StyleSettings::default(),
        });
        let applied = apply_command(&pair_doc(), &command, &ctx());
        assert_eq!(
            applied.outcome,
            CommandOutcome::Skipped(SkipReason::SettingsCommand)
        );
        assert_eq!(applied.document, pair_doc());
    }

    #[test]
    fn input_document_is_never_mutated() {
        let doc = pair_doc();
        let _ = apply_command(
            &doc,
            &FormCommand::DeleteSection(DeleteSection {
                section_id: SectionId::new("s1"),
            }),
            &ctx(),
        );
        assert_eq!(doc, pair_doc());
    }
}
