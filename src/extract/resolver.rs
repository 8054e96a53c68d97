//! Path resolution over upstream records

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Virtual path resolving to the key of the enclosing join element
pub const COLLECTION_ID_PATH: &str = "$collectionId";

/// Virtual path resolving to the current account
pub const ACCOUNT_PATH: &str = "$account";

/// Dotted paths with optional numeric indexing: `a.b[0].c`
static SIMPLE_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]+(\[-?\d+\])?(\.[A-Za-z0-9_\-]+(\[-?\d+\])?)*$")
        .expect("simple path regex is valid")
});

/// Resolves a path within a record to zero or more values.
///
/// Implementations must be pure: the same record and path always give the
/// same values, in the same order.
pub trait PathResolver: Send + Sync {
    /// Resolve `path` against `record`
    fn resolve(&self, record: &Value, path: &str) -> Result<Vec<Value>>;
}

/// Default resolver: dotted paths are walked directly, anything else is
/// evaluated as JSONPath.
///
/// A path that lands on an array yields its elements. Nulls are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathResolver;

impl PathResolver for JsonPathResolver {
    fn resolve(&self, record: &Value, path: &str) -> Result<Vec<Value>> {
        let found = if is_simple_path(path) {
            match find_value(record, path) {
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            }
        } else {
            find_with_jsonpath(record, path)?
        };

        // A single array match is a list attribute, not a list of matches
        let values = match <[Value; 1]>::try_from(found) {
            Ok([Value::Array(items)]) => items,
            Ok([single]) => vec![single],
            Err(found) => found,
        };

        Ok(values.into_iter().filter(|v| !v.is_null()).collect())
    }
}

/// Whether `path` can be walked without a JSONPath engine
pub fn is_simple_path(path: &str) -> bool {
    let path = path.strip_prefix("$.").unwrap_or(path);
    SIMPLE_PATH_REGEX.is_match(path)
}

/// Walk a dotted path (`$.` prefix optional, `[i]` and `[-i]` indexing)
pub fn find_value<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index: i64 = part[bracket_pos + 1..part.len() - 1].parse().ok()?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let arr = current.as_array()?;
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                usize::try_from(arr.len() as i64 + index).ok()?
            } else {
                usize::try_from(index).ok()?
            };
            current = arr.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current)
}

/// First value at `path`, if any. Invalid paths resolve to nothing.
pub fn first_value(value: &Value, path: &str) -> Option<Value> {
    JsonPathResolver
        .resolve(value, path)
        .ok()
        .and_then(|values| values.into_iter().next())
}

/// Render a scalar as a string; objects, arrays and null have no string form
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn find_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}
