//! Datasource loader module
//!
//! Parse datasource definitions from YAML or JSON files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `load_datasource` - Read and validate a definition file
//! - `load_datasource_from_str` - Parse and validate an in-memory definition
//! - `validate_datasource` - Structural checks on an already parsed definition

mod parser;

pub use parser::{load_datasource, load_datasource_from_str, validate_datasource};

#[cfg(test)]
mod tests;
