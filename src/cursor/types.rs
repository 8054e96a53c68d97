//! Cursor types
//!
//! A cursor is a versioned tagged union with one variant per frame shape.
//! It captures positions only; what a position means is decided by the
//! traversal plan it is replayed against.

use crate::types::Token;
use serde::{Deserialize, Serialize};

/// Current cursor schema version
pub const CURSOR_VERSION: u32 = 1;

/// Decoded traversal position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Schema version
    pub version: u32,
    /// Index into the account fan-out list
    pub account_index: usize,
    /// Position within the frame stack; `None` is the start of the traversal
    pub frame: Option<FrameCursor>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

impl Cursor {
    /// The canonical start state
    pub fn start() -> Self {
        Self {
            version: CURSOR_VERSION,
            account_index: 0,
            frame: None,
        }
    }

    /// Cursor at a frame position
    pub fn new(account_index: usize, frame: Option<FrameCursor>) -> Self {
        Self {
            version: CURSOR_VERSION,
            account_index,
            frame,
        }
    }

    /// Whether this is the start state
    pub fn is_start(&self) -> bool {
        self.account_index == 0 && self.frame.is_none()
    }
}

/// One variant per frame shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCursor {
    /// A single paged collection
    Page(PageCursor),
    /// A parent collection and the member collection of its current element
    Composite(CompositeCursor),
    /// Scope → member chain of an advanced filter
    ImplicitFilter(ImplicitFilterCursor),
    /// Scope → member → related chain of an advanced filter
    RelatedFilter(RelatedFilterCursor),
}

impl FrameCursor {
    /// Shape name, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Page(_) => "page",
            Self::Composite(_) => "composite",
            Self::ImplicitFilter(_) => "implicit filter",
            Self::RelatedFilter(_) => "related filter",
        }
    }
}

/// Position within one paged collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    /// Upstream token of the batch in progress; absent for the first batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Token>,
    /// Records of that batch already consumed
    #[serde(default)]
    pub offset: usize,
}

/// Position within a parent collection and the member collection under it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeCursor {
    /// Key of the parent element being expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    /// Upstream token of the parent batch in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_cursor: Option<Token>,
    /// Index of the parent element within that batch
    #[serde(default)]
    pub collection_offset: usize,
    /// Upstream token of the member batch in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Token>,
    /// Member records of that batch already consumed
    #[serde(default)]
    pub offset: usize,
}

/// Position within a scope → member chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitFilterCursor {
    #[serde(default)]
    pub entity_filter_index: usize,
    #[serde(default)]
    pub member_filter_index: usize,
    #[serde(default)]
    pub cursor: CompositeCursor,
}

/// Position within a scope → member → related chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFilterCursor {
    #[serde(default)]
    pub entity_filter_index: usize,
    #[serde(default)]
    pub member_filter_index: usize,
    /// Index of the related entity definition
    #[serde(default)]
    pub entity_index: usize,
    /// Scope and member position
    #[serde(default)]
    pub entity_cursor: CompositeCursor,
    /// Key of the member element being expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    /// Position within the related collection
    #[serde(default)]
    pub related_entity_cursor: PageCursor,
}
