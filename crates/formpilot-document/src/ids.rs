//! Opaque identifiers for document nodes
//!
//! Ids are plain strings on the wire. The newtypes keep element, row and
//! section ids from being mixed up at compile time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a form element (a field or a static block)
    ElementId
);

string_id!(
    /// Identifier of a row inside a section
    RowId
);

string_id!(
    /// Identifier of a section
    SectionId
);

/// Node kind an id is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Form element
    Element,
    /// Row
    Row,
    /// Section
    Section,
}

impl IdKind {
    /// Short prefix used by generators that produce readable ids
    #[inline]
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Element => "el",
            Self::Row => "row",
            Self::Section => "sec",
        }
    }
}

/// Source of fresh ids for nodes created by commands
///
/// The engine asks for an id whenever a command creates a row or section, or
/// an element draft arrives without one.
pub trait IdSource: Send + Sync + fmt::Debug {
    /// Produce a new id that has never been handed out before
    fn next_id(&self, kind: IdKind) -> String;

    /// Fresh element id
    fn element_id(&self) -> ElementId {
        ElementId(self.next_id(IdKind::Element))
    }

    /// Fresh row id
    fn row_id(&self) -> RowId {
        RowId(self.next_id(IdKind::Row))
    }

    /// Fresh section id
    fn section_id(&self) -> SectionId {
        SectionId(self.next_id(IdKind::Section))
    }
}

/// Random v4 UUID ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self, _kind: IdKind) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` ids, one counter shared by all kinds
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    next: AtomicU64,
}

impl SequentialIdSource {
    /// Start counting at 1
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self, kind: IdKind) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", kind.prefix())
    }
}
