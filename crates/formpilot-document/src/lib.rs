//! Formpilot Document Model
//!
//! Typed form documents and the closed set of commands that edit them.
//!
//! # Core Concepts
//!
//! - [`Document`]: ordered Section -> Row -> Element tree, cheap to clone
//! - [`Row`]: at most [`MAX_ROW_ELEMENTS`] side-by-side elements
//! - [`FormState`]: the document plus style, design and confirmation-page settings
//! - [`FormCommand`]: one structured edit, tagged `{name, arguments}` on the wire
//! - [`CommandInvocation`]: an untyped invocation as an agent emits it
//! - [`tool_definitions`]: JSON Schemas the agent is told about
//!
//! # Example
//!
//! ```rust,ignore
//! use formpilot_document::{CommandInvocation, FormCommand};
//!
//! let invocation = CommandInvocation::new(
//!     "deleteFields",
//!     serde_json::json!({ "fieldIds": ["email"] }),
//! );
//! let command: FormCommand = invocation.decode()?;
//! assert_eq!(command.kind().as_str(), "deleteFields");
//! ```

#![warn(unreachable_pub)]

// Core modules
mod command;
mod document;
mod element;
mod ids;
mod invocation;
mod section;
mod settings;
mod tools;

// Re-exports
pub use command::{
    AddElementToRow, AddFields, AddSection, CommandKind, DeleteFields, DeleteSection,
    ElementDraft, FieldUpdates, FormCommand, ReorderFields, ReorderSections, ReplaceForm,
    SectionDraft, SectionUpdates, UnknownCommand, UpdateDesignSettings, UpdateField,
    UpdateFormStyle, UpdateSection, UpdateThankYouPage,
};
pub use document::{Document, DocumentError, ElementLocation};
pub use element::{merge_attributes, Attributes, Element, ElementType};
pub use ids::{
    ElementId, IdKind, IdSource, RowId, SectionId, SequentialIdSource, UuidIdSource,
};
pub use invocation::{decode_all, CommandInvocation, InvocationError};
pub use section::{Row, Section, Side, MAX_ROW_ELEMENTS};
pub use settings::{ConfirmationPageSettings, DesignSettings, FormState, Layout, StyleSettings};
pub use tools::{tool_definitions, ToolDefinition};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
