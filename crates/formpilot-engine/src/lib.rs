//! Formpilot Mutation Engine
//!
//! Applies form commands to documents without ever mutating the input.
//!
//! # Core Concepts
//!
//! - [`apply_command`]: one section-tree command, one new document
//! - [`BatchSequencer`]: settings commands independently, tree commands in
//!   order through one working copy, single publish
//! - [`Selection`]: canvas selection, reconciled once per batch
//!
//! Unknown ids and full rows are never errors: the offending command is a
//! no-op reported as [`CommandOutcome::Skipped`].
//!
//! # Example
//!
//! ```rust,ignore
//! use formpilot_engine::{ApplyContext, BatchSequencer, Selection};
//!
//! let outcome = BatchSequencer::new().apply_batch(&state, &commands, &ApplyContext::default());
//! selection.reconcile(&outcome.effects, &outcome.state.document);
//! ```

#![warn(unreachable_pub)]

mod batch;
mod engine;
mod selection;

pub use batch::{BatchEffects, BatchOutcome, BatchSequencer};
pub use engine::{
    apply_command, ApplyContext, Applied, CommandOutcome, SkipReason, DEFAULT_SECTION_TITLE,
};
pub use selection::Selection;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
