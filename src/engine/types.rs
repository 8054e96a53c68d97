//! Engine types
//!
//! Configuration and statistics for page assembly, plus the internal
//! traversal position.

use crate::extract::ExtractionConfig;
use crate::types::Token;
use serde::Serialize;
use serde_json::Value;

/// Configuration for page assembly
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Records requested per upstream call
    pub upstream_page_size: usize,
    /// Upper bound on concurrent prefetches (1 disables prefetching)
    pub max_concurrency: usize,
    /// Coercion settings
    pub extraction: ExtractionConfig,
    /// Variables available to templates as `config.*`
    pub variables: Value,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            upstream_page_size: 100,
            max_concurrency: 1,
            extraction: ExtractionConfig::default(),
            variables: Value::Null,
        }
    }
}

impl AssemblyConfig {
    /// Create a new assembly config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upstream batch size
    #[must_use]
    pub fn with_upstream_page_size(mut self, size: usize) -> Self {
        self.upstream_page_size = size.max(1);
        self
    }

    /// Set the prefetch concurrency bound
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set coercion settings
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Set template variables
    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

/// Statistics from assembling one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Calls made to the paginator, prefetches included
    pub upstream_calls: usize,
    /// Objects emitted
    pub objects: usize,
    /// Records dropped because an attribute failed to convert
    pub dropped_records: usize,
    /// Join elements skipped because their key was missing
    pub skipped_elements: usize,
}

/// Position within one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FramePosition {
    /// Token of the batch in progress
    pub token: Option<Token>,
    /// Index of the next record in that batch
    pub offset: usize,
    /// Key of the element being expanded (join frames only)
    pub key: Option<String>,
}

/// Full traversal position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TraversalState {
    pub account_index: usize,
    pub branch_index: usize,
    /// One position per frame of the current branch
    pub frames: Vec<FramePosition>,
}

impl TraversalState {
    /// Start of a branch
    pub fn fresh(account_index: usize, branch_index: usize, depth: usize) -> Self {
        Self {
            account_index,
            branch_index,
            frames: vec![FramePosition::default(); depth],
        }
    }

    /// Restart every frame below `level`
    pub fn reset_below(&mut self, level: usize) {
        for frame in self.frames.iter_mut().skip(level + 1) {
            *frame = FramePosition::default();
        }
    }

    /// Move `level` past its current element
    pub fn advance(&mut self, level: usize) {
        if let Some(frame) = self.frames.get_mut(level) {
            frame.offset += 1;
            frame.key = None;
        }
        self.reset_below(level);
    }
}
