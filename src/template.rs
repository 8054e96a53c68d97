//! Template interpolation for selectors and filters
//!
//! Handles `{{ variable }}` interpolation in entity configurations.
//! Available variables:
//! - `account`: the account currently being fanned out over
//! - `collection_id`: key of the enclosing join element
//! - `scope_id`: key of the outermost join element
//! - `config.*`: datasource variables
//!
//! Selectors are URL paths: [`render_path`] percent-encodes the account and
//! join keys as single path segments. Config values are inserted verbatim.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Base for encoding single path segments
static SEGMENT_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://segment.invalid/").expect("segment base URL is valid"));

/// Root names a template may reference
pub const KNOWN_ROOTS: &[&str] = &["account", "collection_id", "scope_id", "config"];

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Datasource variables
    pub config: Value,
    /// Current account
    pub account: Option<String>,
    /// Key of the enclosing join element
    pub collection_id: Option<String>,
    /// Key of the outermost join element
    pub scope_id: Option<String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with datasource variables
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Set the current account
    #[must_use]
    pub fn account(mut self, account: Option<&str>) -> Self {
        self.account = account.map(ToString::to_string);
        self
    }

    /// Set the join keys
    #[must_use]
    pub fn keys(mut self, scope_id: Option<&str>, collection_id: Option<&str>) -> Self {
        self.scope_id = scope_id.map(ToString::to_string);
        self.collection_id = collection_id.map(ToString::to_string);
        self
    }

    /// Get a value by path (e.g., "config.instance")
    fn get(&self, path: &str, encode_keys: bool) -> Option<String> {
        let key = |value: &Option<String>| {
            value.as_deref().map(|v| {
                if encode_keys {
                    encode_segment(v)
                } else {
                    v.to_string()
                }
            })
        };

        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["account"] => key(&self.account),
            ["collection_id"] => key(&self.collection_id),
            ["scope_id"] => key(&self.scope_id),
            ["config", rest @ ..] if !rest.is_empty() => {
                get_nested_value(&self.config, rest).and_then(value_to_string)
            }
            _ => None,
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    render_with(template, ctx, false)
}

/// Render a selector, encoding the account and join keys as path segments.
///
/// A key such as `arn:aws:iam::1:policy/ReadOnly` stays one segment:
/// `arn:aws:iam::1:policy%2FReadOnly`.
pub fn render_path(template: &str, ctx: &TemplateContext) -> Result<String> {
    render_with(template, ctx, true)
}

fn render_with(template: &str, ctx: &TemplateContext, encode_keys: bool) -> Result<String> {
    if !has_templates(template) {
        return Ok(template.to_string());
    }

    let mut errors = Vec::new();
    let result = TEMPLATE_REGEX.replace_all(template, |cap: &regex::Captures<'_>| {
        let var_path = &cap[1];
        if let Some(value) = ctx.get(var_path, encode_keys) {
            value
        } else {
            errors.push(var_path.to_string());
            String::new()
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Check that a template only references known variables
pub fn validate(template: &str) -> Result<()> {
    for var in extract_variables(template) {
        let root = var.split('.').next().unwrap_or_default();
        if !KNOWN_ROOTS.contains(&root) {
            return Err(Error::template(format!(
                "unknown variable '{var}' in '{template}'"
            )));
        }
    }
    Ok(())
}

/// Percent-encode a value as one URL path segment
fn encode_segment(value: &str) -> String {
    let mut url = SEGMENT_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        // For complex types, use JSON serialization
        _ => serde_json::to_string(value).ok(),
    }
}
