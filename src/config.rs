//! Configuration types for entities and datasources
//!
//! This module contains all the configuration structures used to describe
//! which upstream collections make up an entity, how their records map onto
//! attributes, and how a datasource is reached. Everything here is plain
//! serde data, read-only to the paging core.

use crate::types::{AttributeType, JsonValue, StringMap};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Attributes
// ============================================================================

/// One configured attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConfig {
    /// Attribute id on the normalized object
    pub id: String,

    /// Path of the value within the upstream record.
    ///
    /// `$collectionId` and `$account` resolve to the enclosing join key and
    /// the current account.
    pub external_id: String,

    /// Declared type
    #[serde(rename = "type", default)]
    pub attribute_type: AttributeType,

    /// Keep every resolved value instead of the first one
    #[serde(default)]
    pub list: bool,

    /// This attribute carries the record's natural key
    #[serde(default)]
    pub unique_id: bool,
}

impl AttributeConfig {
    /// Create a scalar attribute
    pub fn new(
        id: impl Into<String>,
        external_id: impl Into<String>,
        attribute_type: AttributeType,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            attribute_type,
            list: false,
            unique_id: false,
        }
    }

    /// Mark as a list attribute
    #[must_use]
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Mark as the unique id attribute
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique_id = true;
        self
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Configuration of one entity (users, groups, group members, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity id
    pub id: String,

    /// Upstream selector: a collection name, or a template such as
    /// `groups/{{ collection_id }}/members` for joined entities. For child
    /// entities this is the path of the nested records inside the parent.
    pub external_id: String,

    /// Attributes to extract
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,

    /// Structurally nested entities resolved from each record
    #[serde(default)]
    pub child_entities: Vec<EntityConfig>,

    /// Outer collection this entity is paged under (parent/member join)
    #[serde(default)]
    pub collection: Option<CollectionConfig>,

    /// Scope/member/related chains selecting this entity
    #[serde(default)]
    pub advanced_filters: Vec<ScopeFilter>,

    /// Prefix the unique id with the enclosing join key (`<key>-<id>`)
    #[serde(default)]
    pub composite_unique_id: bool,
}

impl EntityConfig {
    /// Create an entity with no attributes
    pub fn new(id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            attributes: Vec::new(),
            child_entities: Vec::new(),
            collection: None,
            advanced_filters: Vec::new(),
            composite_unique_id: false,
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeConfig) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a child entity
    #[must_use]
    pub fn with_child(mut self, child: EntityConfig) -> Self {
        self.child_entities.push(child);
        self
    }

    /// Page this entity under an outer collection
    #[must_use]
    pub fn with_collection(mut self, collection: CollectionConfig) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Add a scope filter
    #[must_use]
    pub fn with_scope_filter(mut self, filter: ScopeFilter) -> Self {
        self.advanced_filters.push(filter);
        self
    }

    /// The attribute flagged as unique id, if any
    pub fn unique_id_attribute(&self) -> Option<&AttributeConfig> {
        self.attributes.iter().find(|a| a.unique_id)
    }
}

/// Outer collection of a parent/member join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Selector of the outer collection
    pub external_id: String,

    /// Upstream filter applied to the outer collection
    #[serde(default)]
    pub filter: Option<String>,

    /// Path of the key in outer records, exposed as `collection_id`
    pub unique_key: String,
}

impl CollectionConfig {
    /// Create a collection join
    pub fn new(external_id: impl Into<String>, unique_key: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            filter: None,
            unique_key: unique_key.into(),
        }
    }
}

/// One level of an advanced filter chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLevel {
    /// Entity id of the records at this level
    pub entity: String,

    /// Upstream selector (template)
    pub external_id: String,

    /// Upstream filter expression (template)
    #[serde(default)]
    pub filter: Option<String>,

    /// Path of the key handed to the next level as `collection_id`
    #[serde(default)]
    pub unique_key: Option<String>,
}

impl FilterLevel {
    /// Create a filter level
    pub fn new(entity: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            external_id: external_id.into(),
            filter: None,
            unique_key: None,
        }
    }

    /// Set the upstream filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the key path
    #[must_use]
    pub fn with_key(mut self, unique_key: impl Into<String>) -> Self {
        self.unique_key = Some(unique_key.into());
        self
    }
}

/// A scope entity and the member chains hanging off it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub scope: FilterLevel,
    #[serde(default)]
    pub members: Vec<MemberFilter>,
}

/// A member entity and the related entities reached through it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFilter {
    pub member: FilterLevel,
    #[serde(default)]
    pub related: Vec<FilterLevel>,
}

// ============================================================================
// Extraction Settings
// ============================================================================

/// Extra string tokens accepted as booleans
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolTokens {
    #[serde(rename = "true", default)]
    pub truthy: Vec<String>,
    #[serde(rename = "false", default)]
    pub falsy: Vec<String>,
}

impl BoolTokens {
    /// Create a token mapping
    pub fn new(truthy: &[&str], falsy: &[&str]) -> Self {
        Self {
            truthy: truthy.iter().map(ToString::to_string).collect(),
            falsy: falsy.iter().map(ToString::to_string).collect(),
        }
    }

    /// Map a token to a boolean (case-insensitive)
    pub fn lookup(&self, token: &str) -> Option<bool> {
        if self.truthy.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(true)
        } else if self.falsy.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(false)
        } else {
            None
        }
    }
}

// ============================================================================
// Datasource
// ============================================================================

/// A datasource: where records come from and how pages are assembled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceConfig {
    /// Datasource name
    pub name: String,

    /// Accounts to fan out over, in order
    #[serde(default)]
    pub accounts: Vec<String>,

    /// Upper bound on concurrent prefetches
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Records requested per upstream call
    #[serde(default = "default_upstream_page_size")]
    pub upstream_page_size: usize,

    /// Largest page size a caller may ask for
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Deadline applied to each page request
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Extra boolean tokens
    #[serde(default)]
    pub bool_tokens: BoolTokens,

    /// Extra datetime formats (chrono syntax), tried after RFC 3339
    #[serde(default)]
    pub datetime_formats: Vec<String>,

    /// Variables available to selector templates as `config.*`
    #[serde(default)]
    pub variables: JsonValue,

    /// Where records come from
    pub source: SourceConfig,

    /// Entities served by this datasource
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

fn default_max_concurrency() -> usize {
    1
}

fn default_upstream_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    1000
}

impl DatasourceConfig {
    /// Look up an entity by id
    pub fn entity(&self, id: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Per-request deadline
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Record source of a datasource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Generic REST API
    Rest(RestSourceConfig),
    /// JSON fixture file: `{ "<selector>": [records], "<account>/<selector>": [...] }`
    Fixtures {
        path: PathBuf,
        #[serde(default)]
        batch_size: Option<usize>,
    },
}

/// REST source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestSourceConfig {
    /// Base URL; selectors are appended to it
    pub base_url: String,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// Path of the record array in the response body
    #[serde(default)]
    pub record_path: Option<String>,

    /// Query parameter carrying the upstream filter
    #[serde(default)]
    pub filter_param: Option<String>,

    /// Query parameter carrying the account, if accounts are not in the selector
    #[serde(default)]
    pub account_param: Option<String>,

    /// Pagination strategy
    #[serde(default)]
    pub pagination: PaginationDefinition,

    /// Per-call timeout
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,

    /// Client-side rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimitDefinition>,
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

/// Rate limit settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitDefinition {
    pub requests_per_second: u32,
    #[serde(default)]
    pub burst_size: Option<u32>,
}

/// Pagination strategy of a REST source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationDefinition {
    /// Single request
    #[default]
    None,
    /// Token from the response body
    Cursor {
        cursor_param: String,
        cursor_path: String,
        #[serde(default)]
        limit_param: Option<String>,
        #[serde(default)]
        stop_condition: Option<StopConditionDefinition>,
    },
    /// Offset and limit query parameters
    Offset {
        #[serde(default = "default_offset_param")]
        offset_param: String,
        #[serde(default = "default_limit_param")]
        limit_param: String,
        #[serde(default)]
        stop_condition: Option<StopConditionDefinition>,
    },
    /// Page number query parameter
    PageNumber {
        #[serde(default = "default_page_param")]
        page_param: String,
        #[serde(default = "default_start_page")]
        start_page: u32,
        #[serde(default)]
        page_size_param: Option<String>,
        #[serde(default)]
        stop_condition: Option<StopConditionDefinition>,
    },
    /// RFC 5988 `Link` header
    LinkHeader {
        #[serde(default = "default_rel")]
        rel: String,
    },
    /// Next page URL in the response body
    NextUrl { path: String },
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_rel() -> String {
    "next".to_string()
}

/// Stop condition of a REST pagination strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopConditionDefinition {
    EmptyPage,
    Field { path: String, value: JsonValue },
    TotalCount { path: String },
}

// ============================================================================
// Requests
// ============================================================================

/// A request for one page of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Entity to page
    pub entity: EntityConfig,

    /// Maximum number of objects in the page
    pub page_size: usize,

    /// Cursor returned by the previous page; empty for the first page
    #[serde(default)]
    pub cursor: String,

    /// Accounts overriding the datasource fan-out list
    #[serde(default)]
    pub accounts: Option<Vec<String>>,

    /// Deadline for the whole request
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl PageRequest {
    /// First page of an entity
    pub fn new(entity: EntityConfig, page_size: usize) -> Self {
        Self {
            entity,
            page_size,
            cursor: String::new(),
            accounts: None,
            timeout: None,
        }
    }

    /// Continue from a cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    /// Fan out over accounts
    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Set the request deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
