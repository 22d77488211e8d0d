//! Top-level settings records and the full form state
//!
//! Style, design and confirmation-page settings sit beside the section tree,
//! not inside it. Each is replaced or merged by its own command.

use crate::document::Document;
use crate::element::{merge_attributes, Attributes};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Page layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// All sections on one page
    #[default]
    Classic,
    /// One section per step
    Stepped,
}

/// Structural style of the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleSettings {
    /// Page layout
    #[serde(default)]
    pub layout: Layout,
}

/// Colors, fonts and spacing; opaque to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignSettings(pub Attributes);

impl DesignSettings {
    /// Shallow-merge a partial update
    pub fn merge(&mut self, patch: &Attributes) {
        merge_attributes(&mut self.0, patch);
    }
}

/// Thank-you / confirmation page content; opaque to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationPageSettings(pub Attributes);

impl ConfirmationPageSettings {
    /// Shallow-merge a partial update
    pub fn merge(&mut self, patch: &Attributes) {
        merge_attributes(&mut self.0, patch);
    }
}

/// Everything a form editor publishes: the tree plus its three sibling records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    /// Section tree
    #[serde(default)]
    pub document: Document,

    /// Style settings
    #[serde(default)]
    pub style: StyleSettings,

    /// Design settings
    #[serde(default)]
    pub design: DesignSettings,

    /// Confirmation page settings
    #[serde(default)]
    pub confirmation_page: ConfirmationPageSettings,
}

impl FormState {
    /// State wrapping an existing document with default settings
    #[must_use]
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }
}
