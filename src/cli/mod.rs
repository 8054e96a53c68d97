//! CLI module
//!
//! Command-line interface for paging datasources.
//!
//! # Commands
//!
//! - `page` - Fetch one page of an entity
//! - `drain` - Page an entity to exhaustion
//! - `plan` - Show the traversal plan of entities
//! - `cursor` - Decode a cursor
//! - `entities` - List served entities
//! - `validate` - Validate a datasource definition
//! - `serve` - Start HTTP server mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{router, serve, ServerConfig};
