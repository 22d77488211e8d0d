//! Tool definitions advertised to a language model
//!
//! One definition per [`CommandKind`]; the parameter schema is generated from
//! the command's argument struct, so the advertised shape and the decoder
//! can never drift apart.

use crate::command::{
    AddElementToRow, AddFields, AddSection, CommandKind, DeleteFields, DeleteSection,
    ReorderFields, ReorderSections, ReplaceForm, UpdateDesignSettings, UpdateField,
    UpdateFormStyle, UpdateSection, UpdateThankYouPage,
};
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function-calling tool description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Command name
    pub name: String,
    /// What the command does, for the model
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

impl CommandKind {
    /// Model-facing description
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::AddFields => {
                "Add new form fields, each on its own row, after an existing field or at the end of a section."
            }
            Self::DeleteFields => "Delete form fields by id. Unknown ids are ignored.",
            Self::UpdateField => {
                "Change a field's type and/or merge new values into its extra attributes."
            }
            Self::ReorderFields => {
                "Reorder the fields of one section, one field per row. Unlisted fields are kept at the end."
            }
            Self::ReplaceForm => "Replace the whole form with a new list of sections.",
            Self::AddSection => "Add a new section, optionally with initial fields.",
            Self::UpdateSection => "Change a section's title, description or title visibility.",
            Self::DeleteSection => "Delete a section and all of its fields.",
            Self::ReorderSections => {
                "Reorder sections. Unlisted sections are kept at the end."
            }
            Self::AddElementToRow => {
                "Place a new field to the left or right of an existing field, if its row has room."
            }
            Self::UpdateFormStyle => "Set the form layout (classic or stepped).",
            Self::UpdateDesignSettings => "Merge colors, fonts and spacing into the form design.",
            Self::UpdateThankYouPage => "Merge settings into the confirmation (thank-you) page.",
        }
    }

    fn parameters_schema(self) -> RootSchema {
        match self {
            Self::AddFields => schema_for!(AddFields),
            Self::DeleteFields => schema_for!(DeleteFields),
            Self::UpdateField => schema_for!(UpdateField),
            Self::ReorderFields => schema_for!(ReorderFields),
            Self::ReplaceForm => schema_for!(ReplaceForm),
            Self::AddSection => schema_for!(AddSection),
            Self::UpdateSection => schema_for!(UpdateSection),
            Self::DeleteSection => schema_for!(DeleteSection),
            Self::ReorderSections => schema_for!(ReorderSections),
            Self::AddElementToRow => schema_for!(AddElementToRow),
            Self::UpdateFormStyle => schema_for!(UpdateFormStyle),
            Self::UpdateDesignSettings => schema_for!(UpdateDesignSettings),
            Self::UpdateThankYouPage => schema_for!(UpdateThankYouPage),
        }
    }

    /// Tool definition for this command
    ///
    /// # Errors
    /// Fails only if the generated schema cannot be turned into JSON.
    pub fn tool_definition(self) -> Result<ToolDefinition, serde_json::Error> {
        Ok(ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::to_value(self.parameters_schema())?,
        })
    }
}

/// Tool definitions for every command, in taxonomy order
///
/// # Errors
/// Fails only if a generated schema cannot be turned into JSON.
pub fn tool_definitions() -> Result<Vec<ToolDefinition>, serde_json::Error> {
    CommandKind::ALL
        .into_iter()
        .map(CommandKind::tool_definition)
        .collect()
}
