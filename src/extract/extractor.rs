//! Record to object mapping and attribute coercion

use super::resolver::{PathResolver, ACCOUNT_PATH, COLLECTION_ID_PATH};
use crate::config::{AttributeConfig, BoolTokens, EntityConfig};
use crate::error::{Error, Result};
use crate::types::{Attribute, AttributeType, AttributeValue, ChildObject, DatetimeValue, Object};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Formats tried after RFC 3339 and the configured formats
const COMMON_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

// ============================================================================
// Settings
// ============================================================================

/// Datasource-level coercion settings
#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    /// Extra boolean tokens
    pub bool_tokens: BoolTokens,
    /// Extra datetime formats (chrono syntax)
    pub datetime_formats: Vec<String>,
}

impl ExtractionConfig {
    /// Set boolean tokens
    #[must_use]
    pub fn with_bool_tokens(mut self, tokens: BoolTokens) -> Self {
        self.bool_tokens = tokens;
        self
    }

    /// Add a datetime format
    #[must_use]
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_formats.push(format.into());
        self
    }
}

/// Where a record was found
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordContext<'a> {
    /// Current account
    pub account: Option<&'a str>,
    /// Key of the enclosing join element
    pub collection_id: Option<&'a str>,
}

// ============================================================================
// Extractor
// ============================================================================

/// Maps upstream records of one entity onto normalized objects
pub struct AttributeExtractor<'a> {
    entity: &'a EntityConfig,
    resolver: &'a dyn PathResolver,
    config: &'a ExtractionConfig,
}

impl<'a> AttributeExtractor<'a> {
    /// Create an extractor for an entity
    pub fn new(
        entity: &'a EntityConfig,
        resolver: &'a dyn PathResolver,
        config: &'a ExtractionConfig,
    ) -> Self {
        Self {
            entity,
            resolver,
            config,
        }
    }

    /// Build the object for one record.
    ///
    /// Fails with [`Error::AttributeCoercion`] if any value, including one of
    /// a child object, cannot be converted to its declared type.
    pub fn extract(&self, record: &Value, ctx: &RecordContext<'_>) -> Result<Object> {
        let mut object = Object::default();

        for attr in &self.entity.attributes {
            let values = self.attribute_values(record, attr, ctx)?;
            if !values.is_empty() {
                object.attributes.push(Attribute {
                    id: attr.id.clone(),
                    values,
                });
            }
        }

        for child in &self.entity.child_entities {
            let nested = self.resolver.resolve(record, &child.external_id)?;
            let extractor = AttributeExtractor::new(child, self.resolver, self.config);
            let objects = nested
                .iter()
                .map(|item| extractor.extract(item, ctx))
                .collect::<Result<Vec<_>>>()?;

            if !objects.is_empty() {
                object.child_objects.push(ChildObject {
                    entity_id: child.id.clone(),
                    objects,
                });
            }
        }

        Ok(object)
    }

    fn attribute_values(
        &self,
        record: &Value,
        attr: &AttributeConfig,
        ctx: &RecordContext<'_>,
    ) -> Result<Vec<AttributeValue>> {
        let raw = match attr.external_id.as_str() {
            COLLECTION_ID_PATH => ctx
                .collection_id
                .map(|k| vec![Value::String(k.to_string())])
                .unwrap_or_default(),
            ACCOUNT_PATH => ctx
                .account
                .map(|a| vec![Value::String(a.to_string())])
                .unwrap_or_default(),
            path => self.resolver.resolve(record, path)?,
        };

        if !attr.list && raw.len() > 1 {
            debug!(
                "Attribute '{}' resolved {} values, keeping the first",
                attr.id,
                raw.len()
            );
        }
        let take = if attr.list { raw.len() } else { 1 };
        let mut values = raw
            .iter()
            .take(take)
            .map(|v| {
                coerce(v, attr.attribute_type, self.config)
                    .map_err(|message| Error::coercion(&attr.id, message))
            })
            .collect::<Result<Vec<_>>>()?;

        if attr.unique_id && self.entity.composite_unique_id {
            if let Some(key) = ctx.collection_id {
                values = values
                    .into_iter()
                    .map(|v| AttributeValue::StringValue(format!("{key}-{}", v.to_key_string())))
                    .collect();
            }
        }

        Ok(values)
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Convert a raw JSON value to the declared attribute type
pub fn coerce(
    value: &Value,
    attribute_type: AttributeType,
    config: &ExtractionConfig,
) -> std::result::Result<AttributeValue, String> {
    match attribute_type {
        AttributeType::String => coerce_string(value).map(AttributeValue::StringValue),
        AttributeType::Int64 => coerce_int(value).map(AttributeValue::Int64Value),
        AttributeType::Bool => coerce_bool(value, &config.bool_tokens).map(AttributeValue::BoolValue),
        AttributeType::Datetime => coerce_datetime(value, &config.datetime_formats)
            .map(|ts| AttributeValue::DatetimeValue(DatetimeValue::utc(ts))),
    }
}

fn coerce_string(value: &Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err("expected string, got null".to_string()),
        other => serde_json::to_string(other).map_err(|e| e.to_string()),
    }
}

#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn coerce_int(value: &Value) -> std::result::Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(format!("{n} is not a 64-bit integer")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{s}' is not a 64-bit integer")),
        other => Err(format!("expected int64, got {other}")),
    }
}

fn coerce_bool(value: &Value, tokens: &BoolTokens) -> std::result::Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => {
            let s = s.trim();
            if let Some(b) = tokens.lookup(s) {
                return Ok(b);
            }
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Ok(false)
            } else {
                Err(format!("'{s}' is not a boolean"))
            }
        }
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(format!("{n} is not a boolean")),
        },
        other => Err(format!("expected bool, got {other}")),
    }
}

fn coerce_datetime(value: &Value, formats: &[String]) -> std::result::Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => parse_datetime(s.trim(), formats)
            .ok_or_else(|| format!("'{s}' is not a recognized datetime")),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| format!("{n} is not a unix timestamp")),
        other => Err(format!("expected datetime, got {other}")),
    }
}

/// Parse a datetime string into UTC.
///
/// Tries RFC 3339, then each configured format, then a few common layouts,
/// then unix seconds.
pub fn parse_datetime(s: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let configured = formats.iter().map(String::as_str);
    for fmt in configured.chain(COMMON_DATETIME_FORMATS.iter().copied()) {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
