//! The form document tree
//!
//! [`Document`] is the single owned root: Section -> Row -> Element. Sections
//! and rows live in persistent vectors, so cloning a document is O(1) and
//! an edited copy shares every untouched section with the original.

use crate::element::Element;
use crate::ids::{ElementId, RowId, SectionId};
use crate::section::{Section, MAX_ROW_ELEMENTS};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Structural invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// Two elements share an id
    #[error("duplicate element id: {0}")]
    DuplicateElementId(ElementId),

    /// Two sections share an id
    #[error("duplicate section id: {0}")]
    DuplicateSectionId(SectionId),

    /// A row holds more elements than allowed
    #[error("row {row} holds {len} elements (max {max})", max = MAX_ROW_ELEMENTS)]
    RowOverCapacity {
        /// Offending row
        row: RowId,
        /// Elements it holds
        len: usize,
    },
}

/// Position of an element inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLocation {
    /// Section index
    pub section: usize,
    /// Row index within the section
    pub row: usize,
    /// Slot within the row
    pub slot: usize,
}

/// Ordered list of sections making up one form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    sections: Vector<Section>,
}

impl Document {
    /// Empty document (no sections)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document from sections in render order
    #[must_use]
    pub fn from_sections(sections: impl IntoIterator<Item = Section>) -> Self {
        Self {
            sections: sections.into_iter().collect(),
        }
    }

    /// Sections in render order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &Vector<Section> {
        &self.sections
    }

    /// Mutable sections (copy-on-write under the hood)
    #[inline]
    pub fn sections_mut(&mut self) -> &mut Vector<Section> {
        &mut self.sections
    }

    /// True when there is no section at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section by id
    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    /// Index of a section
    #[must_use]
    pub fn section_index(&self, id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == id)
    }

    /// Where an element sits
    #[must_use]
    pub fn locate_element(&self, id: &ElementId) -> Option<ElementLocation> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section, s)| {
                s.rows.iter().enumerate().find_map(|(row, r)| {
                    r.position(id).map(|slot| ElementLocation { section, row, slot })
                })
            })
    }

    /// Element by id
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        let loc = self.locate_element(id)?;
        self.sections[loc.section].rows[loc.row]
            .elements()
            .get(loc.slot)
    }

    /// Whether any section holds `id`
    #[must_use]
    pub fn contains_element(&self, id: &ElementId) -> bool {
        self.locate_element(id).is_some()
    }

    /// Section that holds `id`
    #[must_use]
    pub fn section_of(&self, id: &ElementId) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains_element(id))
    }

    /// All elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.sections.iter().flat_map(Section::elements)
    }

    /// All element ids in document order
    pub fn element_ids(&self) -> impl Iterator<Item = &ElementId> + '_ {
        self.elements().map(|e| &e.id)
    }

    /// Total number of elements
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    /// Verify structural invariants
    ///
    /// # Errors
    /// Returns the first violation found: duplicate element or section id,
    /// or a row above capacity.
    pub fn check_invariants(&self) -> Result<(), DocumentError> {
        let mut section_ids = HashSet::new();
        let mut element_ids = HashSet::new();

        for section in &self.sections {
            if !section_ids.insert(&section.id) {
                return Err(DocumentError::DuplicateSectionId(section.id.clone()));
            }
            for row in &section.rows {
                if row.len() > MAX_ROW_ELEMENTS {
                    return Err(DocumentError::RowOverCapacity {
                        row: row.id.clone(),
                        len: row.len(),
                    });
                }
                for element in row.elements() {
                    if !element_ids.insert(&element.id) {
                        return Err(DocumentError::DuplicateElementId(element.id.clone()));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;
    use crate::section::Row;
    use serde_json::json;

    fn field(id: &str) -> Element {
        Element::new(id, ElementType::TextField)
    }

    fn sample() -> Document {
        Document::from_sections([
            Section::new("s1", "One")
                .with_row(Row::with_elements(RowId::new("r1"), vec![field("a"), field("b")]).unwrap()),
            Section::new("s2", "Two").with_row(Row::single(RowId::new("r2"), field("c"))),
        ])
    }

    #[test]
    fn locate_element_reports_full_path() {
        let doc = sample();
        assert_eq!(
            doc.locate_element(&ElementId::new("b")),
            Some(ElementLocation {
                section: 0,
                row: 0,
                slot: 1
            })
        );
        assert_eq!(doc.section_of(&ElementId::new("c")).unwrap().title, "Two");
        assert!(doc.locate_element(&ElementId::new("nope")).is_none());
    }

    #[test]
    fn element_ids_follow_document_order() {
        let doc = sample();
        let ids: Vec<_> = doc.element_ids().map(ElementId::as_str).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(doc.element_count(), 3);
    }

    #[test]
    fn invariants_hold_for_sample() {
        assert!(sample().check_invariants().is_ok());
    }

    #[test]
    fn duplicate_element_ids_are_reported() {
        let doc = Document::from_sections([
            Section::new("s1", "One").with_row(Row::single(RowId::new("r1"), field("a"))),
            Section::new("s2", "Two").with_row(Row::single(RowId::new("r2"), field("a"))),
        ]);
        assert_eq!(
            doc.check_invariants(),
            Err(DocumentError::DuplicateElementId(ElementId::new("a")))
        );
    }

    #[test]
    fn over_capacity_rows_from_the_wire_are_refused() {
        let err = serde_json::from_value::<Document>(json!({
            "sections": [{
                "id": "s1",
                "title": "One",
                "rows": [{
                    "id": "r1",
                    "elements": [
                        { "id": "a", "type": "TEXT_FIELD" },
                        { "id": "b", "type": "TEXT_FIELD" },
                        { "id": "c", "type": "TEXT_FIELD" }
                    ]
                }]
            }]
        }))
        .unwrap_err();

        assert!(err.to_string().contains("row r1 holds 3 elements"), "{err}");
    }

    #[test]
    fn clones_share_untouched_sections() {
        let original = sample();
        let mut edited = original.clone();
        edited.sections_mut()[1].title = "Renamed".into();

        assert_eq!(original.sections()[1].title, "Two");
        assert_eq!(edited.sections()[0], original.sections()[0]);
    }
}
