//! Canvas selection kept consistent with the document
//!
//! The selected element is held as a snapshot so a properties panel can
//! render it without a lookup. [`Selection::reconcile`] runs once per batch.

use crate::batch::BatchEffects;
use formpilot_document::{Document, Element, ElementId, SectionId};
use serde::Serialize;

/// Selected element and section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    selected_element: Option<Element>,
    selected_section_id: Option<SectionId>,
}

impl Selection {
    /// Nothing selected
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the selected element
    #[inline]
    #[must_use]
    pub fn selected_element(&self) -> Option<&Element> {
        self.selected_element.as_ref()
    }

    /// Id of the selected element
    #[inline]
    #[must_use]
    pub fn selected_element_id(&self) -> Option<&ElementId> {
        self.selected_element.as_ref().map(|e| &e.id)
    }

    /// Id of the selected section
    #[inline]
    #[must_use]
    pub fn selected_section_id(&self) -> Option<&SectionId> {
        self.selected_section_id.as_ref()
    }

    /// True when neither an element nor a section is selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected_element.is_none() && self.selected_section_id.is_none()
    }

    /// Select an element; returns false (and changes nothing) if it is absent
    pub fn select_element(&mut self, document: &Document, id: &ElementId) -> bool {
        match document.element(id) {
            Some(element) => {
                self.selected_element = Some(element.clone());
                true
            }
            None => false,
        }
    }

    /// Select a section; returns false (and changes nothing) if it is absent
    pub fn select_section(&mut self, document: &Document, id: &SectionId) -> bool {
        if document.section(id).is_none() {
            return false;
        }
        self.selected_section_id = Some(id.clone());
        true
    }

    /// Drop the element selection
    #[inline]
    pub fn clear_element(&mut self) {
        self.selected_element = None;
    }

    /// Drop both selections
    #[inline]
    pub fn clear(&mut self) {
        self.selected_element = None;
        self.selected_section_id = None;
    }

    /// Bring the selection in line with a batch that just ran
    ///
    /// First matching rule wins: `replaceForm` clears everything; a deleted
    /// selected element clears the element; a deleted selected section
    /// clears the section; an updated selected element gets the same
    /// updates applied to its snapshot. A final sweep then drops any
    /// selection whose id is gone from `document`.
    pub fn reconcile(&mut self, effects: &BatchEffects, document: &Document) {
        let element_id = self.selected_element_id().cloned();
        let section_id = self.selected_section_id.clone();

        if effects.replaced_form {
            self.clear();
        } else if element_id
            .as_ref()
            .is_some_and(|id| effects.deleted_element_ids.contains(id))
        {
            self.clear_element();
        } else if section_id
            .as_ref()
            .is_some_and(|id| effects.deleted_section_ids.contains(id))
        {
            self.selected_section_id = None;
        } else if let (Some(id), Some(snapshot)) = (&element_id, self.selected_element.as_mut()) {
            for (_, updates) in effects.field_updates.iter().filter(|(target, _)| target == id) {
                snapshot.apply_updates(updates);
            }
        }

        if self
            .selected_element_id()
            .is_some_and(|id| !document.contains_element(id))
        {
            self.clear_element();
        }
        if self
            .selected_section_id
            .as_ref()
            .is_some_and(|id| document.section(id).is_none())
        {
            self.selected_section_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formpilot_document::{ElementType, FieldUpdates, Row, RowId, Section};
    use serde_json::json;

    fn doc() -> Document {
        Document::from_sections([Section::new("s1", "One").with_row(Row::single(
            RowId::new("r1"),
            Element::new("a", ElementType::TextField).with_attribute("label", "Old"),
        ))])
    }

    fn selected() -> Selection {
        let mut selection = Selection::new();
        assert!(selection.select_element(&doc(), &ElementId::new("a")));
        assert!(selection.select_section(&doc(), &SectionId::new("s1")));
        selection
    }

    #[test]
    fn selecting_absent_ids_is_refused() {
        let mut selection = Selection::new();
        assert!(!selection.select_element(&doc(), &ElementId::new("ghost")));
        assert!(!selection.select_section(&doc(), &SectionId::new("ghost")));
        assert!(selection.is_empty());
    }

    #[test]
    fn replace_form_clears_everything() {
        let mut selection = selected();
        let effects = BatchEffects {
            replaced_form: true,
            ..BatchEffects::default()
        };
        selection.reconcile(&effects, &doc());
        assert!(selection.is_empty());
    }

    #[test]
    fn deleted_element_clears_only_element() {
        let mut selection = selected();
        let effects = BatchEffects {
            deleted_element_ids: [ElementId::new("a")].into_iter().collect(),
            ..BatchEffects::default()
        };
        let after = Document::from_sections([Section::new("s1", "One")]);
        selection.reconcile(&effects, &after);

        assert_eq!(selection.selected_element(), None);
        assert_eq!(selection.selected_section_id(), Some(&SectionId::new("s1")));
    }

    #[test]
    fn updated_element_snapshot_follows_updates() {
        let mut selection = selected();
        let mut patch = formpilot_document::Attributes::new();
        patch.insert("label".into(), json!("New"));
        let effects = BatchEffects {
            field_updates: vec![(
                ElementId::new("a"),
                FieldUpdates {
                    element_type: None,
                    extra_attributes: Some(patch),
                },
            )],
            ..BatchEffects::default()
        };
        selection.reconcile(&effects, &doc());

        assert_eq!(selection.selected_element().and_then(Element::label), Some("New"));
    }

    #[test]
    fn sweep_clears_ids_gone_from_document() {
        let mut selection = selected();
        selection.reconcile(&BatchEffects::default(), &Document::new());
        assert!(selection.is_empty());
    }
}
