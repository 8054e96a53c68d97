//! Tests for extract module

use super::*;
use crate::config::{AttributeConfig, BoolTokens, EntityConfig};
use crate::types::{AttributeType, AttributeValue};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

fn strings(values: &[&str]) -> Vec<AttributeValue> {
    values
        .iter()
        .map(|v| AttributeValue::StringValue((*v).to_string()))
        .collect()
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[test_case("email", json!(["a@x.io"]) ; "plain field")]
#[test_case("$.email", json!(["a@x.io"]) ; "dollar prefix")]
#[test_case("profile.title", json!(["Engineer"]) ; "nested field")]
#[test_case("tags", json!(["admin", "dev"]) ; "array field is flattened")]
#[test_case("tags[1]", json!(["dev"]) ; "index")]
#[test_case("tags[-1]", json!(["dev"]) ; "negative index")]
#[test_case("manager", json!([]) ; "null dropped")]
#[test_case("missing.path", json!([]) ; "missing path")]
#[test_case("$.groups[*].name", json!(["ops", "eng"]) ; "jsonpath wildcard")]
fn test_resolve(path: &str, expected: Value) {
    let record = json!({
        "email": "a@x.io",
        "profile": {"title": "Engineer"},
        "tags": ["admin", "dev"],
        "manager": null,
        "groups": [{"name": "ops"}, {"name": "eng"}]
    });

    let values = JsonPathResolver.resolve(&record, path).unwrap();
    assert_eq!(Value::Array(values), expected);
}

#[test]
fn test_simple_path_detection() {
    assert!(is_simple_path("a.b.c"));
    assert!(is_simple_path("$.items[0].id"));
    assert!(is_simple_path("user-name"));
    assert!(!is_simple_path("$.items[*].id"));
    assert!(!is_simple_path("$..id"));
    assert!(!is_simple_path("$.items[?(@.active)]"));
}

#[test]
fn test_first_value_and_scalar_to_string() {
    let body = json!({"meta": {"next": "abc", "total": 42}});
    assert_eq!(first_value(&body, "meta.next"), Some(json!("abc")));
    assert_eq!(first_value(&body, "meta.none"), None);
    assert_eq!(scalar_to_string(&json!(42)), Some("42".to_string()));
    assert_eq!(scalar_to_string(&json!({"a": 1})), None);
}

// ============================================================================
// Coercion Tests
// ============================================================================

#[test_case(json!("x"), AttributeValue::StringValue("x".into()) ; "string passthrough")]
#[test_case(json!(12), AttributeValue::StringValue("12".into()) ; "number as string")]
#[test_case(json!(true), AttributeValue::StringValue("true".into()) ; "bool as string")]
fn test_coerce_string(raw: Value, expected: AttributeValue) {
    let got = coerce(&raw, AttributeType::String, &ExtractionConfig::default()).unwrap();
    assert_eq!(got, expected);
}

#[test_case(json!(42), Some(42) ; "number")]
#[test_case(json!("-7"), Some(-7) ; "numeric string")]
#[test_case(json!(3.0), Some(3) ; "integral float")]
#[test_case(json!(3.5), None ; "fractional float")]
#[test_case(json!("abc"), None ; "text")]
#[test_case(json!(true), None ; "bool")]
fn test_coerce_int(raw: Value, expected: Option<i64>) {
    let got = coerce(&raw, AttributeType::Int64, &ExtractionConfig::default()).ok();
    assert_eq!(got, expected.map(AttributeValue::Int64Value));
}

#[test_case(json!(true), Some(true) ; "bool")]
#[test_case(json!("TRUE"), Some(true) ; "true string")]
#[test_case(json!("false"), Some(false) ; "false string")]
#[test_case(json!("yes"), Some(true) ; "configured truthy")]
#[test_case(json!("No"), Some(false) ; "configured falsy")]
#[test_case(json!(1), Some(true) ; "one")]
#[test_case(json!(0), Some(false) ; "zero")]
#[test_case(json!("maybe"), None ; "unknown token")]
fn test_coerce_bool(raw: Value, expected: Option<bool>) {
    let config =
        ExtractionConfig::default().with_bool_tokens(BoolTokens::new(&["yes"], &["no"]));
    let got = coerce(&raw, AttributeType::Bool, &config).ok();
    assert_eq!(got, expected.map(AttributeValue::BoolValue));
}

#[test_case("2024-03-01T10:00:00Z", (2024, 3, 1, 10, 0, 0) ; "rfc3339 utc")]
#[test_case("2024-03-01T12:00:00+02:00", (2024, 3, 1, 10, 0, 0) ; "rfc3339 offset normalized")]
#[test_case("2024-03-01 10:00:00", (2024, 3, 1, 10, 0, 0) ; "space separated")]
#[test_case("2024-03-01", (2024, 3, 1, 0, 0, 0) ; "date only")]
#[test_case("1709287200", (2024, 3, 1, 10, 0, 0) ; "unix seconds")]
fn test_coerce_datetime(raw: &str, expected: (i32, u32, u32, u32, u32, u32)) {
    let (y, mo, d, h, mi, s) = expected;
    let got = coerce(&json!(raw), AttributeType::Datetime, &ExtractionConfig::default()).unwrap();

    match got {
        AttributeValue::DatetimeValue(dt) => {
            assert_eq!(dt.timestamp, Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap());
            assert_eq!(dt.timezone_offset, 0);
        }
        other => panic!("Expected datetime, got {other:?}"),
    }
}

#[test]
fn test_coerce_datetime_configured_format() {
    let config = ExtractionConfig::default().with_datetime_format("%d.%m.%Y %H:%M");
    let parsed = parse_datetime("01.03.2024 10:30", &config.datetime_formats).unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());

    assert!(coerce(&json!("yesterday"), AttributeType::Datetime, &config).is_err());
}

// ============================================================================
// Extractor Tests
// ============================================================================

fn user_entity() -> EntityConfig {
    EntityConfig::new("users", "users")
        .with_attribute(AttributeConfig::new("id", "id", AttributeType::String).unique())
        .with_attribute(AttributeConfig::new("email", "emails", AttributeType::String))
        .with_attribute(AttributeConfig::new("aliases", "emails", AttributeType::String).list())
        .with_attribute(AttributeConfig::new("age", "age", AttributeType::Int64))
        .with_attribute(AttributeConfig::new("manager", "manager", AttributeType::String))
}

#[test]
fn test_scalar_takes_first_value() {
    let entity = user_entity();
    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);

    let record = json!({"id": "u1", "emails": ["a@x.io", "b@x.io"], "age": 30});
    let object = extractor.extract(&record, &RecordContext::default()).unwrap();

    assert_eq!(object.attribute("email").unwrap().values, strings(&["a@x.io"]));
    assert_eq!(
        object.attribute("aliases").unwrap().values,
        strings(&["a@x.io", "b@x.io"])
    );
    assert_eq!(
        object.first_value("age"),
        Some(&AttributeValue::Int64Value(30))
    );
}

#[test]
fn test_missing_values_are_omitted() {
    let entity = user_entity();
    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);

    let object = extractor
        .extract(&json!({"id": "u1", "manager": null}), &RecordContext::default())
        .unwrap();

    let ids: Vec<&str> = object.attributes.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["id"]);
}

#[test]
fn test_coercion_failure_names_attribute() {
    let entity = user_entity();
    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);

    let err = extractor
        .extract(&json!({"id": "u1", "age": "old"}), &RecordContext::default())
        .unwrap_err();

    match err {
        crate::Error::AttributeCoercion { attribute, .. } => assert_eq!(attribute, "age"),
        other => panic!("Expected coercion error, got {other:?}"),
    }
}

#[test]
fn test_virtual_paths_and_composite_id() {
    let mut entity = EntityConfig::new("policy_statements", "policies/{{ collection_id }}")
        .with_attribute(AttributeConfig::new("name", "name", AttributeType::String).unique())
        .with_attribute(AttributeConfig::new("policy", "$collectionId", AttributeType::String))
        .with_attribute(AttributeConfig::new("account", "$account", AttributeType::String));
    entity.composite_unique_id = true;

    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);
    let ctx = RecordContext {
        account: Some("acct-1"),
        collection_id: Some("arn:policy/Admin"),
    };

    let object = extractor.extract(&json!({"name": "s1"}), &ctx).unwrap();
    assert_eq!(
        object.attribute("name").unwrap().values,
        strings(&["arn:policy/Admin-s1"])
    );
    assert_eq!(
        object.attribute("policy").unwrap().values,
        strings(&["arn:policy/Admin"])
    );
    assert_eq!(object.attribute("account").unwrap().values, strings(&["acct-1"]));
}

#[test]
fn test_composite_id_without_join_key_is_plain() {
    let mut entity = EntityConfig::new("users", "users")
        .with_attribute(AttributeConfig::new("id", "id", AttributeType::String).unique());
    entity.composite_unique_id = true;

    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);
    let object = extractor
        .extract(&json!({"id": "u1"}), &RecordContext::default())
        .unwrap();
    assert_eq!(object.attribute("id").unwrap().values, strings(&["u1"]));
}

#[test]
fn test_child_entities() {
    let entity = EntityConfig::new("groups", "groups")
        .with_attribute(AttributeConfig::new("id", "id", AttributeType::String).unique())
        .with_child(
            EntityConfig::new("owners", "owners")
                .with_attribute(AttributeConfig::new("user", "userId", AttributeType::String)),
        )
        .with_child(EntityConfig::new("labels", "labels"));

    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);
    let record = json!({
        "id": "g1",
        "owners": [{"userId": "u1"}, {"userId": "u2"}]
    });

    let object = extractor.extract(&record, &RecordContext::default()).unwrap();
    let owners = object.children("owners");
    assert_eq!(owners.len(), 2);
    assert_eq!(owners[1].attribute("user").unwrap().values, strings(&["u2"]));
    assert!(object.children("labels").is_empty());
    assert_eq!(object.child_objects.len(), 1);
}

#[test]
fn test_child_coercion_failure_fails_record() {
    let entity = EntityConfig::new("groups", "groups").with_child(
        EntityConfig::new("owners", "owners")
            .with_attribute(AttributeConfig::new("since", "since", AttributeType::Datetime)),
    );

    let config = ExtractionConfig::default();
    let extractor = AttributeExtractor::new(&entity, &JsonPathResolver, &config);
    let record = json!({"owners": [{"since": "not a date"}]});

    assert!(extractor.extract(&record, &RecordContext::default()).is_err());
}
