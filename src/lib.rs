// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # SoR Connector Kit
//!
//! Resumable, cursor-driven paging over identity systems of record.
//!
//! ## Features
//!
//! - **Nested traversal**: flat collections, parent/member joins, and
//!   scope → member → related filter chains
//! - **Multi-account fan-out**: the same entity paged across accounts in order
//! - **Opaque cursors**: every page carries the exact position to resume from,
//!   so pages concatenate to the full result set with no gaps or repeats
//! - **Pluggable sources**: any [`pagination::UpstreamPaginator`]; a generic
//!   REST adapter and a fixture-backed one are included
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sor_cdk::{Connector, PageRequest, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connector = Connector::from_file("datasources/servicenow.yaml")?;
//!     let entity = connector.entity("users")?.clone();
//!
//!     let mut request = PageRequest::new(entity, 100);
//!     loop {
//!         let page = connector.get_page(&request).await?;
//!         // Process page.objects
//!         if page.is_last() {
//!             break;
//!         }
//!         request.cursor = page.next_cursor;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Connector                                │
//! │   get_page(entity, page_size, cursor) → (objects, next cursor)  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────────┬───┴──────────┬──────────────┬────────┐
//! │  Planner  │    Engine    │    Cursor    │   Extract    │ Source │
//! ├───────────┼──────────────┼──────────────┼──────────────┼────────┤
//! │ Branches  │ Depth-first  │ Versioned    │ JSONPath     │ REST   │
//! │ Frames    │ Batch replay │ base64 JSON  │ Coercion     │ Fixture│
//! │ Accounts  │ Prefetch     │              │ Child objects│        │
//! └───────────┴──────────────┴──────────────┴──────────────┴────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the kit
pub mod error;

/// Common types and type aliases
pub mod types;

/// Entity and datasource configuration
pub mod config;

/// Template interpolation
pub mod template;

/// Cursor codec
pub mod cursor;

/// Upstream pagination contract and in-memory source
pub mod pagination;

/// HTTP client, rate limiting and the REST source
pub mod http;

/// Record to object mapping
pub mod extract;

/// Traversal planning
pub mod planner;

/// Page assembly
pub mod engine;

/// Connector façade
pub mod connector;

/// Datasource definition loader
pub mod loader;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorClass, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{DatasourceConfig, EntityConfig, PageRequest};
pub use connector::Connector;
pub use engine::{AssemblyConfig, PageAssembler};
pub use loader::{load_datasource, load_datasource_from_str};
pub use pagination::{InMemoryPaginator, UpstreamPaginator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
