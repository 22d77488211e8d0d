//! Formpilot Core - form editing sessions
//!
//! Everything around the mutation engine that makes an agent-driven editor:
//! - [`AgentChannel`]: the streaming language-model seam
//! - [`ChatStore`]: chat history and applied flags, in memory or as JSON files
//! - [`WorkflowController`]: the forward-only build pipeline
//! - [`FormEditor`]: one form's state, selection, history and workflow
//!
//! # Example
//!
//! ```rust,ignore
//! use formpilot_core::prelude::*;
//!
//! # async fn example(channel: Arc<dyn AgentChannel>) -> Result<(), CoreError> {
//! let store = Arc::new(InMemoryChatStore::new());
//! let mut editor = FormEditor::open(
//!     FormId::new("contact"),
//!     FormState::default(),
//!     channel,
//!     store,
//!     EditorConfig::new(),
//! )
//! .await?;
//!
//! if let Some(reply) = editor.send_message("Build a contact form").await? {
//!     editor.mark_message_applied(reply.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod channel;
pub mod config;
pub mod editor;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod turn;
pub mod types;
pub mod workflow;

// Re-exports for convenience
pub use channel::{AgentChannel, ChannelEvent, ChannelStatus, InvocationPart};
pub use config::{EditorConfig, IdlePollPolicy, DEFAULT_CONTINUE_PROMPT};
pub use editor::{ApplyReport, FormEditor};
pub use error::{ChannelError, ConfigError, CoreError, CoreResult, PersistenceError, StoreResult};
pub use store::{ChatStore, InMemoryChatStore, JsonFileChatStore};
pub use telemetry::init_tracing;
pub use turn::{collect_turn, AssistantTurn, TurnAccumulator};
pub use types::{ChatMessage, ChatSession, FormId, MessageId, Role, SessionId};
pub use workflow::{denial_prompt, stage_for_kinds, wait_for_idle, WorkflowController, WorkflowStep};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding a form editor
    pub use crate::{
        AgentChannel, ChatStore, CoreError, EditorConfig, FormEditor, FormId, InMemoryChatStore,
        JsonFileChatStore, WorkflowStep,
    };
    pub use formpilot_document::{FormCommand, FormState};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
