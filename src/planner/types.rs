//! Traversal plan types

use crate::config::EntityConfig;
use serde::Serialize;
use std::fmt;

/// What a frame iterates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRole {
    /// The entity's own collection (flat traversal)
    Collection,
    /// Outer collection of a parent/member join
    Parent,
    /// Scope level of an advanced filter
    Scope,
    /// Member level of an advanced filter
    Member,
    /// Related level of an advanced filter
    Related,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collection => "collection",
            Self::Parent => "parent",
            Self::Scope => "scope",
            Self::Member => "member",
            Self::Related => "related",
        };
        f.write_str(name)
    }
}

/// One level of nested iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub role: FrameRole,
    /// Entity whose records this frame yields
    pub entity_id: String,
    /// Selector template
    pub selector: String,
    /// Filter template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Path of the key handed to the next level; `None` on the innermost frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
}

impl Frame {
    pub(crate) fn new(role: FrameRole, entity_id: &str, selector: &str) -> Self {
        Self {
            role,
            entity_id: entity_id.to_string(),
            selector: selector.to_string(),
            filter: None,
            key_path: None,
        }
    }

    #[must_use]
    pub(crate) fn with_filter(mut self, filter: Option<&String>) -> Self {
        self.filter = filter.cloned();
        self
    }

    #[must_use]
    pub(crate) fn with_key(mut self, key_path: &str) -> Self {
        self.key_path = Some(key_path.to_string());
        self
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.role, self.entity_id, self.selector)
    }
}

/// Cursor shape a branch is resumed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanShape {
    /// One collection
    Flat,
    /// Parent → member
    Collection,
    /// Scope → member
    ImplicitFilter,
    /// Scope → member → related
    RelatedFilter,
}

/// Position of a branch within the advanced filter tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchId {
    pub entity_filter_index: usize,
    pub member_filter_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_index: Option<usize>,
}

/// One independent frame stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub id: BranchId,
    pub shape: PlanShape,
    /// Frames, outermost first
    pub frames: Vec<Frame>,
}

impl Branch {
    /// The frame whose records become objects
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Number of nested levels
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// The ordered traversal of one entity
#[derive(Debug, Clone, Serialize)]
pub struct TraversalPlan<'a> {
    #[serde(skip)]
    pub entity: &'a EntityConfig,
    /// Accounts to fan out over; empty means a single account-less pass
    pub accounts: Vec<String>,
    /// Branches in traversal order
    pub branches: Vec<Branch>,
}

impl TraversalPlan<'_> {
    /// Number of account passes
    pub fn account_count(&self) -> usize {
        self.accounts.len().max(1)
    }

    /// Account of a pass
    pub fn account(&self, index: usize) -> Option<&str> {
        self.accounts.get(index).map(String::as_str)
    }

    /// Find a branch by id
    pub fn branch_index(&self, id: &BranchId) -> Option<usize> {
        self.branches.iter().position(|b| &b.id == id)
    }
}
