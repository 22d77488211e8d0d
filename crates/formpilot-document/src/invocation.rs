//! Untyped command invocations as emitted by an agent
//!
//! An agent names a command and hands over loosely-typed JSON arguments.
//! [`CommandInvocation::decode`] turns that into a [`FormCommand`], or says
//! precisely why it cannot.

use crate::command::{CommandKind, FormCommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why an invocation could not become a command
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// Name is not one of the known commands
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Arguments do not match the command's declared shape
    #[error("invalid arguments for {name}: {source}")]
    InvalidArguments {
        /// Command the arguments were meant for
        name: CommandKind,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },
}

/// `{name, arguments}` pair stored verbatim with an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Command name (`addFields`, `updateFormStyle`, ...)
    pub name: String,

    /// Structured arguments
    #[serde(default)]
    pub arguments: Value,
}

impl CommandInvocation {
    /// Create invocation
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Decode into a typed command
    ///
    /// # Errors
    /// [`InvocationError::UnknownCommand`] for a name outside the taxonomy,
    /// [`InvocationError::InvalidArguments`] when the arguments do not fit.
    pub fn decode(&self) -> Result<FormCommand, InvocationError> {
        let kind = CommandKind::from_name(&self.name)
            .ok_or_else(|| InvocationError::UnknownCommand(self.name.clone()))?;

        let tagged = serde_json::json!({
            "name": self.name,
            "arguments": self.arguments,
        });
        serde_json::from_value(tagged)
            .map_err(|source| InvocationError::InvalidArguments { name: kind, source })
    }
}

impl From<&FormCommand> for CommandInvocation {
    fn from(command: &FormCommand) -> Self {
        // Serializing a FormCommand cannot fail: every field is a string,
        // bool, enum or JSON value.
        let arguments = serde_json::to_value(command)
            .ok()
            .and_then(|mut v| v.get_mut("arguments").map(Value::take))
            .unwrap_or(Value::Null);
        Self {
            name: command.kind().as_str().to_string(),
            arguments,
        }
    }
}

/// Decode a list, keeping successes and failures apart
///
/// Order of the successful commands follows the input order.
#[must_use]
pub fn decode_all(
    invocations: &[CommandInvocation],
) -> (Vec<FormCommand>, Vec<(usize, InvocationError)>) {
    let mut commands = Vec::with_capacity(invocations.len());
    let mut failures = Vec::new();

    for (index, invocation) in invocations.iter().enumerate() {
        match invocation.decode() {
            Ok(command) => commands.push(command),
            Err(err) => failures.push((index, err)),
        }
    }

    (commands, failures)
}
