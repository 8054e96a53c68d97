//! Common types used throughout the SoR connector kit
//!
//! This module contains shared type aliases and the normalized output model:
//! attribute values, objects and pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// Opaque upstream pagination token
pub type Token = String;

// ============================================================================
// Attribute Types
// ============================================================================

/// Declared type of a configured attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    #[default]
    String,
    Int64,
    Bool,
    Datetime,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Bool => "bool",
            Self::Datetime => "datetime",
        };
        f.write_str(name)
    }
}

/// Timestamp carried on the wire as UTC plus an offset in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatetimeValue {
    pub timestamp: DateTime<Utc>,
    pub timezone_offset: i32,
}

impl DatetimeValue {
    /// Canonical form: UTC with zero offset
    pub fn utc(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            timezone_offset: 0,
        }
    }
}

/// Attribute value union as exposed on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    StringValue(String),
    Int64Value(i64),
    BoolValue(bool),
    DatetimeValue(DatetimeValue),
}

impl AttributeValue {
    /// Borrow the string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as a plain string (used for keys and ids)
    pub fn to_key_string(&self) -> String {
        match self {
            Self::StringValue(s) => s.clone(),
            Self::Int64Value(n) => n.to_string(),
            Self::BoolValue(b) => b.to_string(),
            Self::DatetimeValue(dt) => dt.timestamp.to_rfc3339(),
        }
    }
}

// ============================================================================
// Objects and Pages
// ============================================================================

/// One resolved attribute of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub values: Vec<AttributeValue>,
}

/// Child objects of one child entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildObject {
    pub entity_id: String,
    pub objects: Vec<Object>,
}

/// A normalized record. Never mutated after emission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_objects: Vec<ChildObject>,
}

impl Object {
    /// Look up an attribute by id
    pub fn attribute(&self, id: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// First value of an attribute
    pub fn first_value(&self, id: &str) -> Option<&AttributeValue> {
        self.attribute(id).and_then(|a| a.values.first())
    }

    /// Child objects of a child entity
    pub fn children(&self, entity_id: &str) -> &[Object] {
        self.child_objects
            .iter()
            .find(|c| c.entity_id == entity_id)
            .map(|c| c.objects.as_slice())
            .unwrap_or_default()
    }
}

/// One page of normalized objects plus the cursor to continue from.
///
/// An empty `next_cursor` means the traversal is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub objects: Vec<Object>,
    #[serde(default, alias = "next_cursor")]
    pub next_cursor: String,
}

impl Page {
    /// Whether the traversal is complete
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_attribute_type_serde() {
        let ty: AttributeType = serde_json::from_str("\"int64\"").unwrap();
        assert_eq!(ty, AttributeType::Int64);
        assert_eq!(AttributeType::Datetime.to_string(), "datetime");
        assert_eq!(AttributeType::default(), AttributeType::String);
    }

    #[test]
    fn test_attribute_value_wire_shape() {
        let value = AttributeValue::BoolValue(true);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"bool_value": true}));

        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let value = AttributeValue::DatetimeValue(DatetimeValue::utc(ts));
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"datetime_value": {"timestamp": "2024-01-02T03:04:05Z", "timezone_offset": 0}})
        );
    }

    #[test]
    fn test_object_lookup() {
        let object = Object {
            attributes: vec![Attribute {
                id: "email".to_string(),
                values: vec![AttributeValue::StringValue("a@example.com".to_string())],
            }],
            child_objects: vec![ChildObject {
                entity_id: "emails".to_string(),
                objects: vec![Object::default()],
            }],
        };

        assert_eq!(
            object.first_value("email").and_then(AttributeValue::as_str),
            Some("a@example.com")
        );
        assert!(object.attribute("missing").is_none());
        assert_eq!(object.children("emails").len(), 1);
        assert!(object.children("phones").is_empty());
    }

    #[test]
    fn test_page_is_last() {
        assert!(Page::default().is_last());
        let page = Page {
            objects: vec![],
            next_cursor: "abc".to_string(),
        };
        assert!(!page.is_last());
    }

    #[test]
    fn test_page_wire_format() {
        let page = Page {
            objects: vec![],
            next_cursor: "abc".to_string(),
        };
        let wire = serde_json::to_value(&page).unwrap();
        assert_eq!(wire, json!({"objects": [], "nextCursor": "abc"}));

        let back: Page = serde_json::from_value(json!({"objects": [], "next_cursor": "abc"})).unwrap();
        assert_eq!(back, page);
    }
}
