//! Form edit commands
//!
//! Provides [`FormCommand`], the closed set of structured edits an agent (or
//! the user) can request. Commands are data, not behaviour: the engine crate
//! decides what each one does to a document.
//!
//! On the wire a command is `{"name": "<camelCase>", "arguments": {...}}`.

use crate::element::{Attributes, Element, ElementType};
use crate::ids::{ElementId, IdSource, SectionId};
use crate::section::Side;
use crate::settings::StyleSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element payload carried by commands; `id` is assigned when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElementDraft {
    /// Explicit id; generated when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,

    /// Field kind
    #[serde(rename = "type")]
    pub element_type: ElementType,

    /// Type-specific attributes (label, placeholder, options, ...)
    #[serde(default)]
    pub extra_attributes: Attributes,
}

impl ElementDraft {
    /// Draft with no id and no attributes
    #[must_use]
    pub fn new(element_type: ElementType) -> Self {
        Self {
            id: None,
            element_type,
            extra_attributes: Attributes::new(),
        }
    }

    /// Set one attribute
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra_attributes.insert(key.into(), value.into());
        self
    }

    /// Pin the id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Materialize, drawing an id from `ids` if none was given
    #[must_use]
    pub fn into_element(self, ids: &dyn IdSource) -> Element {
        Element {
            id: self.id.unwrap_or_else(|| ids.element_id()),
            element_type: self.element_type,
            extra_attributes: self.extra_attributes,
        }
    }
}

impl From<Element> for ElementDraft {
    fn from(element: Element) -> Self {
        Self {
            id: Some(element.id),
            element_type: element.element_type,
            extra_attributes: element.extra_attributes,
        }
    }
}

/// Partial element update for `updateField`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdates {
    /// New field kind
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,

    /// Attributes to shallow-merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_attributes: Option<Attributes>,
}

/// Partial section update for `updateSection`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionUpdates {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Show or hide the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,
}

/// Section payload for `replaceForm`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    /// Explicit id; generated when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SectionId>,

    /// Section title
    pub title: String,

    /// Section description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the title is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,

    /// Elements, one per row
    #[serde(default)]
    pub elements: Vec<ElementDraft>,
}

/// Add new elements, each in its own row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddFields {
    /// Elements to add
    pub elements: Vec<ElementDraft>,

    /// Insert right after the row holding this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after_field_id: Option<ElementId>,

    /// Append to this section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
}

/// Remove elements by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFields {
    /// Ids to remove
    pub field_ids: Vec<ElementId>,
}

/// Change one element's type and/or attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateField {
    /// Target element
    pub field_id: ElementId,

    /// Changes to apply
    pub updates: FieldUpdates,
}

/// Reorder the elements of one section, one element per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderFields {
    /// Section to reorder
    pub section_id: SectionId,

    /// Desired order; unlisted elements are kept at the end
    pub field_ids: Vec<ElementId>,
}

/// Replace the whole section tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceForm {
    /// New sections
    pub sections: Vec<SectionDraft>,
}

/// Insert a new section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddSection {
    /// Section title
    pub title: String,

    /// Section description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the title is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,

    /// Insert after this section instead of at the end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after_section_id: Option<SectionId>,

    /// Initial elements, one per row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementDraft>,
}

/// Change a section's title, description or title visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSection {
    /// Target section
    pub section_id: SectionId,

    /// Changes to apply
    pub updates: SectionUpdates,
}

/// Remove a section and everything in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSection {
    /// Section to remove
    pub section_id: SectionId,
}

/// Reorder sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSections {
    /// Desired order; unlisted sections are kept at the end
    pub section_ids: Vec<SectionId>,
}

/// Place a new element beside an existing one in the same row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddElementToRow {
    /// Section holding the target
    pub section_id: SectionId,

    /// Element whose row receives the new element
    pub target_element_id: ElementId,

    /// Side of the target to place the element on
    pub position: Side,

    /// Element to add
    pub element: ElementDraft,
}

/// Replace the style settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormStyle {
    /// New style
    pub style: StyleSettings,
}

/// Merge into the design settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDesignSettings {
    /// Keys to set (colors, fonts, spacing, ...)
    pub settings: Attributes,
}

/// Merge into the confirmation page settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThankYouPage {
    /// Keys to set (title, message, redirect, ...)
    pub settings: Attributes,
}

/// Structured edit request
///
/// NOT free text: every variant is a typed operation with a declared
/// argument shape. Section-tree commands depend on order; settings commands
/// touch only their own record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "camelCase")]
pub enum FormCommand {
    /// See [`AddFields`]
    AddFields(AddFields),
    /// See [`DeleteFields`]
    DeleteFields(DeleteFields),
    /// See [`UpdateField`]
    UpdateField(UpdateField),
    /// See [`ReorderFields`]
    ReorderFields(ReorderFields),
    /// See [`ReplaceForm`]
    ReplaceForm(ReplaceForm),
    /// See [`AddSection`]
    AddSection(AddSection),
    /// See [`UpdateSection`]
    UpdateSection(UpdateSection),
    /// See [`DeleteSection`]
    DeleteSection(DeleteSection),
    /// See [`ReorderSections`]
    ReorderSections(ReorderSections),
    /// See [`AddElementToRow`]
    AddElementToRow(AddElementToRow),
    /// See [`UpdateFormStyle`]
    UpdateFormStyle(UpdateFormStyle),
    /// See [`UpdateDesignSettings`]
    UpdateDesignSettings(UpdateDesignSettings),
    /// See [`UpdateThankYouPage`]
    UpdateThankYouPage(UpdateThankYouPage),
}

impl FormCommand {
    /// Discriminant
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::AddFields(_) => CommandKind::AddFields,
            Self::DeleteFields(_) => CommandKind::DeleteFields,
            Self::UpdateField(_) => CommandKind::UpdateField,
            Self::ReorderFields(_) => CommandKind::ReorderFields,
            Self::ReplaceForm(_) => CommandKind::ReplaceForm,
            Self::AddSection(_) => CommandKind::AddSection,
            Self::UpdateSection(_) => CommandKind::UpdateSection,
            Self::DeleteSection(_) => CommandKind::DeleteSection,
            Self::ReorderSections(_) => CommandKind::ReorderSections,
            Self::AddElementToRow(_) => CommandKind::AddElementToRow,
            Self::UpdateFormStyle(_) => CommandKind::UpdateFormStyle,
            Self::UpdateDesignSettings(_) => CommandKind::UpdateDesignSettings,
            Self::UpdateThankYouPage(_) => CommandKind::UpdateThankYouPage,
        }
    }
}

/// Command name without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    /// `addFields`
    AddFields,
    /// `deleteFields`
    DeleteFields,
    /// `updateField`
    UpdateField,
    /// `reorderFields`
    ReorderFields,
    /// `replaceForm`
    ReplaceForm,
    /// `addSection`
    AddSection,
    /// `updateSection`
    UpdateSection,
    /// `deleteSection`
    DeleteSection,
    /// `reorderSections`
    ReorderSections,
    /// `addElementToRow`
    AddElementToRow,
    /// `updateFormStyle`
    UpdateFormStyle,
    /// `updateDesignSettings`
    UpdateDesignSettings,
    /// `updateThankYouPage`
    UpdateThankYouPage,
}

impl CommandKind {
    /// Every command, in taxonomy order
    pub const ALL: [CommandKind; 13] = [
        Self::AddFields,
        Self::DeleteFields,
        Self::UpdateField,
        Self::ReorderFields,
        Self::ReplaceForm,
        Self::AddSection,
        Self::UpdateSection,
        Self::DeleteSection,
        Self::ReorderSections,
        Self::AddElementToRow,
        Self::UpdateFormStyle,
        Self::UpdateDesignSettings,
        Self::UpdateThankYouPage,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddFields => "addFields",
            Self::DeleteFields => "deleteFields",
            Self::UpdateField => "updateField",
            Self::ReorderFields => "reorderFields",
            Self::ReplaceForm => "replaceForm",
            Self::AddSection => "addSection",
            Self::UpdateSection => "updateSection",
            Self::DeleteSection => "deleteSection",
            Self::ReorderSections => "reorderSections",
            Self::AddElementToRow => "addElementToRow",
            Self::UpdateFormStyle => "updateFormStyle",
            Self::UpdateDesignSettings => "updateDesignSettings",
            Self::UpdateThankYouPage => "updateThankYouPage",
        }
    }

    /// Look up a wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Style, design and confirmation-page commands
    ///
    /// These never touch the section tree and are independent of each other
    /// and of tree commands.
    #[inline]
    #[must_use]
    pub fn is_settings(self) -> bool {
        matches!(
            self,
            Self::UpdateFormStyle | Self::UpdateDesignSettings | Self::UpdateThankYouPage
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown command name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for CommandKind {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownCommand(s.to_string()))
    }
}
