//! Extract module
//!
//! Maps upstream JSON records onto normalized objects.
//!
//! # Overview
//!
//! Path evaluation is injected through the [`PathResolver`] trait;
//! [`JsonPathResolver`] walks dotted paths directly and falls back to
//! `jsonpath-rust` for anything richer. [`AttributeExtractor`] applies the
//! scalar/list rules and coerces each value to the attribute's declared type.

mod extractor;
mod resolver;

pub use extractor::{coerce, parse_datetime, AttributeExtractor, ExtractionConfig, RecordContext};
pub use resolver::{
    find_value, first_value, is_simple_path, scalar_to_string, JsonPathResolver, PathResolver,
    ACCOUNT_PATH, COLLECTION_ID_PATH,
};

#[cfg(test)]
mod tests;
