use formpilot_document::{
    AddElementToRow, AddFields, AddSection, DeleteFields, DeleteSection, Document, Element,
    ElementDraft, ElementId, ElementType, FormCommand, FormState, ReorderFields, ReorderSections,
    ReplaceForm, Row, RowId, Section, SectionDraft, SectionId, SequentialIdSource, Side,
    MAX_ROW_ELEMENTS,
};
use formpilot_engine::{apply_command, ApplyContext, BatchSequencer, Selection};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::BTreeSet;
use std::sync::Arc;

fn ctx() -> ApplyContext {
    ApplyContext::new(Arc::new(SequentialIdSource::new()))
}

/// 1-3 sections of up to 3 rows, each row holding 1 or 2 elements `e<n>`
fn arb_document() -> impl Strategy<Value = Document> {
    prop::collection::vec(prop::collection::vec(1usize..=MAX_ROW_ELEMENTS, 0..4), 1..4).prop_map(
        |sections| {
            let mut next = 0;
            let sections: Vec<Section> = sections
                .into_iter()
                .enumerate()
                .map(|(s, rows)| {
                    let mut section = Section::new(format!("s{s}"), format!("Section {s}"));
                    for (r, width) in rows.into_iter().enumerate() {
                        let elements: Vec<Element> = (0..width)
                            .map(|_| {
                                next += 1;
                                Element::new(format!("e{next}"), ElementType::TextField)
                            })
                            .collect();
                        let row = Row::with_elements(RowId::new(format!("s{s}r{r}")), elements)
                            .unwrap();
                        section = section.with_row(row);
                    }
                    section
                })
                .collect();
            Document::from_sections(sections)
        },
    )
}

fn arb_element_id() -> impl Strategy<Value = ElementId> {
    (1usize..16).prop_map(|n| ElementId::new(format!("e{n}")))
}

fn arb_section_id() -> impl Strategy<Value = SectionId> {
    (0usize..4).prop_map(|n| SectionId::new(format!("s{n}")))
}

fn arb_tree_command() -> impl Strategy<Value = FormCommand> {
    prop_oneof![
        prop::collection::vec(arb_element_id(), 0..4)
            .prop_map(|field_ids| FormCommand::DeleteFields(DeleteFields { field_ids })),
        (arb_element_id(), prop::option::of(arb_section_id()), any::<bool>()).prop_map(
            |(anchor, section_id, anchored)| FormCommand::AddFields(AddFields {
                elements: vec![ElementDraft::new(ElementType::TextField)],
                insert_after_field_id: anchored.then_some(anchor),
                section_id,
            })
        ),
        (
            arb_section_id(),
            arb_element_id(),
            prop_oneof![Just(Side::Left), Just(Side::Right)]
        )
            .prop_map(|(section_id, target_element_id, position)| {
                FormCommand::AddElementToRow(AddElementToRow {
                    section_id,
                    target_element_id,
                    position,
                    element: ElementDraft::new(ElementType::EmailField),
                })
            }),
        (arb_section_id(), prop::collection::vec(arb_element_id(), 0..6)).prop_map(
            |(section_id, field_ids)| FormCommand::ReorderFields(ReorderFields {
                section_id,
                field_ids
            })
        ),
        arb_section_id().prop_map(|section_id| FormCommand::DeleteSection(DeleteSection {
            section_id
        })),
        prop::collection::vec(arb_section_id(), 0..4)
            .prop_map(|section_ids| FormCommand::ReorderSections(ReorderSections { section_ids })),
        Just(FormCommand::AddSection(AddSection {
            title: "Extra".into(),
            description: None,
            show_title: None,
            insert_after_section_id: None,
            elements: vec![ElementDraft::new(ElementType::DateField)],
        })),
    ]
}

fn element_set(section: &Section) -> BTreeSet<ElementId> {
    section.element_ids().cloned().collect()
}

proptest! {
    #[test]
    fn prop_delete_is_idempotent(
        doc in arb_document(),
        field_ids in prop::collection::vec(arb_element_id(), 0..5),
    ) {
        let command = FormCommand::DeleteFields(DeleteFields { field_ids });
        let once = apply_command(&doc, &command, &ctx()).document;
        let twice = apply_command(&once, &command, &ctx()).document;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_rows_never_exceed_capacity(
        doc in arb_document(),
        commands in prop::collection::vec(arb_tree_command(), 0..12),
    ) {
        let state = FormState::with_document(doc);
        let outcome = BatchSequencer::new().apply_batch(&state, &commands, &ctx());
        prop_assert!(outcome.state.document.check_invariants().is_ok());

        // Fresh id source so both paths hand out the same generated ids.
        let ctx = ctx();
        let mut doc = state.document;
        for command in &commands {
            doc = apply_command(&doc, command, &ctx).document;
            for section in doc.sections() {
                for row in &section.rows {
                    prop_assert!(row.len() <= MAX_ROW_ELEMENTS);
                    prop_assert!(!row.is_empty());
                }
            }
        }
        prop_assert_eq!(doc, outcome.state.document);
    }

    #[test]
    fn prop_reorder_preserves_membership(
        doc in arb_document(),
        section in arb_section_id(),
        field_ids in prop::collection::vec(arb_element_id(), 0..10),
    ) {
        prop_assume!(doc.section(&section).is_some());
        let before = doc.section(&section).map(element_set).unwrap_or_default();
        let before_count = doc.element_count();

        let command = FormCommand::ReorderFields(ReorderFields {
            section_id: section.clone(),
            field_ids,
        });
        let after = apply_command(&doc, &command, &ctx()).document;

        let reordered = after.section(&section).unwrap();
        prop_assert_eq!(element_set(reordered), before);
        prop_assert_eq!(after.element_count(), before_count);
        prop_assert!(reordered.rows.iter().all(|row| row.len() == 1));
    }

    #[test]
    fn prop_replace_form_clears_selection(
        doc in arb_document(),
        pick in any::<Index>(),
        mut commands in prop::collection::vec(arb_tree_command(), 0..6),
        at in any::<Index>(),
    ) {
        let mut selection = Selection::new();
        selection.select_section(&doc, &SectionId::new("s0"));
        let ids: Vec<ElementId> = doc.element_ids().cloned().collect();
        if !ids.is_empty() {
            selection.select_element(&doc, &ids[pick.index(ids.len())]);
        }

        let replace = FormCommand::ReplaceForm(ReplaceForm {
            sections: vec![SectionDraft {
                id: Some(SectionId::new("s0")),
                title: "Fresh".into(),
                description: None,
                show_title: None,
                elements: vec![ElementDraft::new(ElementType::TextField).with_id("e1")],
            }],
        });
        let at = at.index(commands.len() + 1);
        commands.insert(at, replace);

        let outcome = BatchSequencer::new()
            .apply_batch(&FormState::with_document(doc), &commands, &ctx());
        selection.reconcile(&outcome.effects, &outcome.state.document);

        prop_assert_eq!(selection.selected_element_id(), None);
        prop_assert_eq!(selection.selected_section_id(), None);
    }

    #[test]
    fn prop_deleting_selected_element_clears_it(
        doc in arb_document(),
        pick in any::<Index>(),
        mut commands in prop::collection::vec(arb_tree_command(), 0..8),
        at in any::<Index>(),
        extra in prop::collection::vec(arb_element_id(), 0..3),
    ) {
        let ids: Vec<ElementId> = doc.element_ids().cloned().collect();
        prop_assume!(!ids.is_empty());
        let target = ids[pick.index(ids.len())].clone();

        let mut selection = Selection::new();
        prop_assert!(selection.select_element(&doc, &target));

        let mut field_ids = vec![target];
        field_ids.extend(extra);
        let at = at.index(commands.len() + 1);
        commands.insert(at, FormCommand::DeleteFields(DeleteFields { field_ids }));

        let outcome = BatchSequencer::new()
            .apply_batch(&FormState::with_document(doc), &commands, &ctx());
        selection.reconcile(&outcome.effects, &outcome.state.document);

        prop_assert_eq!(selection.selected_element_id(), None);
    }

    #[test]
    fn prop_selection_never_points_at_absent_ids(
        doc in arb_document(),
        element in arb_element_id(),
        section in arb_section_id(),
        commands in prop::collection::vec(arb_tree_command(), 0..10),
    ) {
        let mut selection = Selection::new();
        selection.select_element(&doc, &element);
        selection.select_section(&doc, &section);

        let outcome = BatchSequencer::new()
            .apply_batch(&FormState::with_document(doc), &commands, &ctx());
        let doc = &outcome.state.document;
        selection.reconcile(&outcome.effects, doc);

        if let Some(id) = selection.selected_element_id() {
            prop_assert!(doc.contains_element(id));
        }
        if let Some(id) = selection.selected_section_id() {
            prop_assert!(doc.section(id).is_some());
        }
    }
}
