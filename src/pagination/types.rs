//! Pagination types and traits
//!
//! Defines the upstream paging contract shared by every record source.

use crate::config::StopConditionDefinition;
use crate::error::Result;
use crate::extract::{first_value, scalar_to_string};
use crate::types::Token;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// One upstream call: which collection, and which batch of it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    /// Account the collection belongs to
    pub account: Option<String>,
    /// Entity whose records live in the collection
    pub entity_id: String,
    /// Rendered selector
    pub selector: String,
    /// Rendered upstream filter
    pub filter: Option<String>,
    /// Token of the batch; `None` for the first one
    pub token: Option<Token>,
    /// Records wanted per batch (a hint)
    pub page_size: usize,
}

impl FetchRequest {
    /// First batch of a collection
    pub fn new(entity_id: impl Into<String>, selector: impl Into<String>, page_size: usize) -> Self {
        Self {
            account: None,
            entity_id: entity_id.into(),
            selector: selector.into(),
            filter: None,
            token: None,
            page_size,
        }
    }

    /// Set the account
    #[must_use]
    pub fn with_account(mut self, account: Option<String>) -> Self {
        self.account = account;
        self
    }

    /// Set the upstream filter
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Set the batch token
    #[must_use]
    pub fn with_token(mut self, token: Option<Token>) -> Self {
        self.token = token;
        self
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.entity_id, self.selector)?;
        if let Some(account) = &self.account {
            write!(f, " in account '{account}'")?;
        }
        if let Some(token) = &self.token {
            write!(f, " at token '{token}'")?;
        }
        Ok(())
    }
}

/// Whether more batches follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextToken {
    /// Fetch the next batch with this token
    Continue(Token),
    /// No more batches
    Done,
}

impl NextToken {
    /// Check if this is the last batch
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The continuation token, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Continue(token) => Some(token),
            Self::Done => None,
        }
    }
}

/// One batch of upstream records
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamPage {
    pub records: Vec<Value>,
    pub next: NextToken,
}

impl UpstreamPage {
    /// Final batch
    pub fn done(records: Vec<Value>) -> Self {
        Self {
            records,
            next: NextToken::Done,
        }
    }

    /// Batch followed by more
    pub fn more(records: Vec<Value>, token: impl Into<Token>) -> Self {
        Self {
            records,
            next: NextToken::Continue(token.into()),
        }
    }
}

/// A source of upstream record batches.
///
/// Implementations translate vendor pagination into opaque tokens and
/// classify their failures through [`crate::Error::is_retryable`]. Tokens must
/// be replayable: fetching the same request twice yields the same batch.
#[async_trait]
pub trait UpstreamPaginator: Send + Sync {
    /// Fetch one batch
    async fn next(&self, request: &FetchRequest) -> Result<UpstreamPage>;
}

// ============================================================================
// Stop Conditions
// ============================================================================

/// Stop conditions for token strategies
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Path to the field
        path: String,
        /// Expected value to stop
        value: Value,
    },

    /// Stop when the records fetched so far reach a total count
    TotalCount {
        /// Path to total count field
        path: String,
    },
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a total count stop condition
    pub fn total_count(path: impl Into<String>) -> Self {
        Self::TotalCount { path: path.into() }
    }

    /// Whether a response ends pagination.
    ///
    /// `fetched` counts records up to and including this batch.
    pub fn should_stop(&self, body: &Value, records_count: usize, fetched: u64) -> bool {
        match self {
            Self::EmptyPage => records_count == 0,
            Self::Field { path, value } => first_value(body, path).is_some_and(|v| &v == value),
            Self::TotalCount { path } => first_value(body, path)
                .as_ref()
                .and_then(scalar_to_string)
                .and_then(|s| s.parse::<u64>().ok())
                .is_some_and(|total| fetched >= total),
        }
    }
}

impl From<&StopConditionDefinition> for StopCondition {
    fn from(def: &StopConditionDefinition) -> Self {
        match def {
            StopConditionDefinition::EmptyPage => Self::EmptyPage,
            StopConditionDefinition::Field { path, value } => Self::field(path, value.clone()),
            StopConditionDefinition::TotalCount { path } => Self::total_count(path),
        }
    }
}
