//! Rows and sections
//!
//! A [`Row`] holds at most [`MAX_ROW_ELEMENTS`] side-by-side elements. The
//! capacity is enforced by the row itself, so no caller can build a
//! three-element row through this API.

use crate::element::Element;
use crate::ids::{ElementId, RowId, SectionId};
use im::Vector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum number of elements sharing a row
pub const MAX_ROW_ELEMENTS: usize = 2;

/// Which side of an existing element a new one is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Before the target element
    Left,
    /// After the target element
    Right,
}

/// Horizontal group of 0, 1 or 2 elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RowRepr")]
pub struct Row {
    /// Row id
    pub id: RowId,
    elements: Vec<Element>,
}

/// Unchecked wire form of a [`Row`]
#[derive(Deserialize)]
struct RowRepr {
    id: RowId,
    #[serde(default)]
    elements: Vec<Element>,
}

impl TryFrom<RowRepr> for Row {
    type Error = String;

    fn try_from(repr: RowRepr) -> Result<Self, Self::Error> {
        let id = repr.id;
        Self::with_elements(id.clone(), repr.elements).map_err(|elements| {
            format!(
                "row {id} holds {} elements, at most {MAX_ROW_ELEMENTS} allowed",
                elements.len()
            )
        })
    }
}

impl Row {
    /// Empty row
    #[inline]
    #[must_use]
    pub fn empty(id: RowId) -> Self {
        Self {
            id,
            elements: Vec::new(),
        }
    }

    /// Row holding exactly one element
    #[inline]
    #[must_use]
    pub fn single(id: RowId, element: Element) -> Self {
        Self {
            id,
            elements: vec![element],
        }
    }

    /// Row from an explicit element list
    ///
    /// Returns the elements back if there are more than [`MAX_ROW_ELEMENTS`].
    pub fn with_elements(id: RowId, elements: Vec<Element>) -> Result<Self, Vec<Element>> {
        if elements.len() > MAX_ROW_ELEMENTS {
            return Err(elements);
        }
        Ok(Self { id, elements })
    }

    /// Elements, left to right
    #[inline]
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Consume the row
    #[inline]
    #[must_use]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the row holds no element (and should be pruned)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True when no further element fits
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.elements.len() >= MAX_ROW_ELEMENTS
    }

    /// Whether the row holds `id`
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.position(id).is_some()
    }

    /// Slot of `id` within the row
    #[must_use]
    pub fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    /// Place `element` next to `target`
    ///
    /// Hands the element back when the row is full or `target` is not in it.
    pub fn insert_beside(
        &mut self,
        target: &ElementId,
        side: Side,
        element: Element,
    ) -> Result<(), Element> {
        if self.is_full() {
            return Err(element);
        }
        let Some(slot) = self.position(target) else {
            return Err(element);
        };
        let at = match side {
            Side::Left => slot,
            Side::Right => slot + 1,
        };
        self.elements.insert(at, element);
        Ok(())
    }

    /// Drop every element for which `keep` returns false; returns how many went
    pub fn retain(&mut self, mut keep: impl FnMut(&Element) -> bool) -> usize {
        let before = self.elements.len();
        self.elements.retain(|e| keep(e));
        before - self.elements.len()
    }

    /// Mutable access to one element
    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }
}

/// Titled group of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Section id
    pub id: SectionId,

    /// Display title
    pub title: String,

    /// Optional description under the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the title is rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,

    /// Rows in render order
    #[serde(default)]
    pub rows: Vector<Row>,
}

impl Section {
    /// Section with no rows
    #[must_use]
    pub fn new(id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            show_title: None,
            rows: Vector::new(),
        }
    }

    /// Append a row (builder style)
    #[must_use]
    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push_back(row);
        self
    }

    /// Flattened elements: row order, then slot order within a row
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.rows.iter().flat_map(|row| row.elements().iter())
    }

    /// Ids of [`Section::elements`]
    pub fn element_ids(&self) -> impl Iterator<Item = &ElementId> + '_ {
        self.elements().map(|e| &e.id)
    }

    /// Index of the row containing `id`
    #[must_use]
    pub fn row_index_of(&self, id: &ElementId) -> Option<usize> {
        self.rows.iter().position(|row| row.contains(id))
    }

    /// Whether any row holds `id`
    #[must_use]
    pub fn contains_element(&self, id: &ElementId) -> bool {
        self.row_index_of(id).is_some()
    }

    /// Remove rows that no longer hold any element; returns how many went
    pub fn prune_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !row.is_empty());
        before - self.rows.len()
    }
}
