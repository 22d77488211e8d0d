//! Form elements
//!
//! An [`Element`] is a typed leaf of the document tree. Its
//! `extraAttributes` bag is schema-less on purpose: only the field-type
//! definitions know what goes in it, the engine just merges it.

use crate::command::FieldUpdates;
use crate::ids::ElementId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Schema-less attribute bag (label, placeholder, options, ...)
pub type Attributes = serde_json::Map<String, Value>;

/// Shallow merge: every top-level key of `patch` overwrites the same key in `base`
pub fn merge_attributes(base: &mut Attributes, patch: &Attributes) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}

/// Field kinds a form element can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    /// Single-line text input
    TextField,
    /// Static heading
    TitleField,
    /// Static sub-heading
    SubtitleField,
    /// Static paragraph of text
    ParagraphField,
    /// Horizontal rule
    SeparatorField,
    /// Vertical whitespace
    SpacerField,
    /// Numeric input
    NumberField,
    /// Multi-line text input
    TextAreaField,
    /// Date picker
    DateField,
    /// Time picker
    TimeField,
    /// Dropdown
    SelectField,
    /// Single checkbox
    CheckboxField,
    /// Radio group
    RadioField,
    /// Email input
    EmailField,
    /// Phone number input
    PhoneField,
    /// URL input
    UrlField,
    /// Static image
    ImageField,
    /// File upload
    FileUploadField,
    /// Star / scale rating
    RatingField,
    /// Signature pad
    SignatureField,
}

impl ElementType {
    /// Every element type, in palette order
    pub const ALL: [ElementType; 20] = [
        Self::TextField,
        Self::TitleField,
        Self::SubtitleField,
        Self::ParagraphField,
        Self::SeparatorField,
        Self::SpacerField,
        Self::NumberField,
        Self::TextAreaField,
        Self::DateField,
        Self::TimeField,
        Self::SelectField,
        Self::CheckboxField,
        Self::RadioField,
        Self::EmailField,
        Self::PhoneField,
        Self::UrlField,
        Self::ImageField,
        Self::FileUploadField,
        Self::RatingField,
        Self::SignatureField,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextField => "TEXT_FIELD",
            Self::TitleField => "TITLE_FIELD",
            Self::SubtitleField => "SUBTITLE_FIELD",
            Self::ParagraphField => "PARAGRAPH_FIELD",
            Self::SeparatorField => "SEPARATOR_FIELD",
            Self::SpacerField => "SPACER_FIELD",
            Self::NumberField => "NUMBER_FIELD",
            Self::TextAreaField => "TEXT_AREA_FIELD",
            Self::DateField => "DATE_FIELD",
            Self::TimeField => "TIME_FIELD",
            Self::SelectField => "SELECT_FIELD",
            Self::CheckboxField => "CHECKBOX_FIELD",
            Self::RadioField => "RADIO_FIELD",
            Self::EmailField => "EMAIL_FIELD",
            Self::PhoneField => "PHONE_FIELD",
            Self::UrlField => "URL_FIELD",
            Self::ImageField => "IMAGE_FIELD",
            Self::FileUploadField => "FILE_UPLOAD_FIELD",
            Self::RatingField => "RATING_FIELD",
            Self::SignatureField => "SIGNATURE_FIELD",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single form element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique across the whole document
    pub id: ElementId,

    /// Field kind
    #[serde(rename = "type")]
    pub element_type: ElementType,

    /// Type-specific attributes, opaque to the engine
    #[serde(default)]
    pub extra_attributes: Attributes,
}

impl Element {
    /// Create element with no attributes
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ElementId>, element_type: ElementType) -> Self {
        Self {
            id: id.into(),
            element_type,
            extra_attributes: Attributes::new(),
        }
    }

    /// Set one attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_attributes.insert(key.into(), value.into());
        self
    }

    /// `extraAttributes.label`, when it is a string
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.extra_attributes.get("label").and_then(Value::as_str)
    }

    /// Apply an `updateField` payload in place
    ///
    /// `type` is replaced when present; `extraAttributes` is shallow-merged.
    pub fn apply_updates(&mut self, updates: &FieldUpdates) {
        if let Some(element_type) = updates.element_type {
            self.element_type = element_type;
        }
        if let Some(patch) = &updates.extra_attributes {
            merge_attributes(&mut self.extra_attributes, patch);
        }
    }
}
