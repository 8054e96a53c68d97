//! Tests for datasource loader module

use super::*;
use crate::config::{PaginationDefinition, SourceConfig};
use crate::types::AttributeType;
use std::io::Write;

const MINIMAL: &str = r#"
name: directory
source:
  type: fixtures
  path: fixtures.json
entities:
  - id: users
    external_id: users
    attributes:
      - id: id
        external_id: id
        unique_id: true
"#;

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_datasource() {
    let def = load_datasource_from_str(MINIMAL).unwrap();
    assert_eq!(def.name, "directory");
    assert_eq!(def.entities.len(), 1);
    assert_eq!(def.entities[0].attributes[0].attribute_type, AttributeType::String);
    assert!(def.accounts.is_empty());
    assert_eq!(def.max_concurrency, 1);
    assert_eq!(def.upstream_page_size, 100);
    assert_eq!(def.max_page_size, 1000);
    assert_eq!(def.request_timeout(), None);
}

#[test]
fn test_load_rest_datasource() {
    let yaml = r#"
name: servicenow
accounts: [dev, prod]
max_concurrency: 4
request_timeout_ms: 5000
variables:
  table: sys_user
source:
  type: rest
  base_url: https://example.service-now.com/api/now/table
  record_path: result
  filter_param: sysparm_query
  pagination:
    type: offset
    offset_param: sysparm_offset
    limit_param: sysparm_limit
  rate_limit:
    requests_per_second: 10
entities:
  - id: users
    external_id: "{{ config.table }}"
    attributes:
      - id: id
        external_id: sys_id
        unique_id: true
      - id: active
        external_id: active
        type: bool
"#;

    let def = load_datasource_from_str(yaml).unwrap();
    assert_eq!(def.accounts, vec!["dev", "prod"]);
    assert_eq!(def.max_concurrency, 4);
    assert_eq!(
        def.request_timeout(),
        Some(std::time::Duration::from_millis(5000))
    );
    assert_eq!(def.variables["table"], "sys_user");

    let SourceConfig::Rest(rest) = &def.source else {
        panic!("expected a REST source");
    };
    assert_eq!(rest.record_path.as_deref(), Some("result"));
    assert_eq!(rest.timeout_ms, 30_000);
    assert!(matches!(
        &rest.pagination,
        PaginationDefinition::Offset { offset_param, .. } if offset_param == "sysparm_offset"
    ));
}

#[test]
fn test_load_advanced_filters() {
    let yaml = r#"
name: servicenow
source:
  type: fixtures
  path: data.json
entities:
  - id: role
    external_id: sys_user_has_role
    advanced_filters:
      - scope:
          entity: group
          external_id: sys_user_group
          filter: type=admin
          unique_key: sys_id
        members:
          - member:
              entity: user
              external_id: sys_user_grmember
              filter: "group={{ collection_id }}"
              unique_key: user
            related:
              - entity: role
                external_id: sys_user_has_role
                filter: "user={{ collection_id }}"
"#;

    let def = load_datasource_from_str(yaml).unwrap();
    let filters = &def.entities[0].advanced_filters;
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].members[0].related[0].entity, "role");
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_empty_name_rejected() {
    let yaml = MINIMAL.replace("name: directory", "name: \"\"");
    assert!(load_datasource_from_str(&yaml).is_err());
}

#[test]
fn test_no_entities_rejected() {
    let yaml = r#"
name: empty
source:
  type: fixtures
  path: data.json
"#;
    let err = load_datasource_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("at least one entity"));
}

#[test]
fn test_duplicate_entities_rejected() {
    let yaml = r#"
name: dup
source:
  type: fixtures
  path: data.json
entities:
  - id: users
    external_id: users
  - id: users
    external_id: people
"#;
    let err = load_datasource_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate entity id"));
}

#[test]
fn test_duplicate_accounts_rejected() {
    let yaml = MINIMAL.replace("name: directory", "name: directory\naccounts: [a, a]");
    assert!(load_datasource_from_str(&yaml).is_err());
}

#[test]
fn test_zero_bounds_rejected() {
    let yaml = MINIMAL.replace("name: directory", "name: directory\nmax_page_size: 0");
    assert!(load_datasource_from_str(&yaml).is_err());

    let yaml = MINIMAL.replace("name: directory", "name: directory\nmax_concurrency: 0");
    assert!(load_datasource_from_str(&yaml).is_err());
}

#[test]
fn test_invalid_base_url_rejected() {
    let yaml = r#"
name: rest
source:
  type: rest
  base_url: "not a url"
entities:
  - id: users
    external_id: users
"#;
    assert!(load_datasource_from_str(yaml).is_err());
}

#[test]
fn test_join_variable_in_outer_selector_rejected() {
    let yaml = r#"
name: broken
source:
  type: fixtures
  path: data.json
entities:
  - id: members
    external_id: "groups/{{ collection_id }}/members"
"#;
    assert!(load_datasource_from_str(yaml).is_err());
}

#[test]
fn test_invalid_yaml() {
    let err = load_datasource_from_str("name: [unclosed").unwrap_err();
    assert!(err.to_string().contains("Failed to parse datasource YAML"));
}

// ============================================================================
// File Loading Tests
// ============================================================================

#[test]
fn test_load_yaml_file_resolves_fixture_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("datasource.yaml");
    std::fs::write(&path, MINIMAL).unwrap();

    let def = load_datasource(&path).unwrap();
    let SourceConfig::Fixtures { path: fixtures, .. } = &def.source else {
        panic!("expected a fixture source");
    };
    assert_eq!(fixtures, &dir.path().join("fixtures.json"));
}

#[test]
fn test_load_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{
            "name": "json-source",
            "source": {{"type": "fixtures", "path": "/data/fixtures.json", "batch_size": 2}},
            "entities": [{{"id": "users", "external_id": "users"}}]
        }}"#
    )
    .unwrap();

    let def = load_datasource(file.path()).unwrap();
    assert_eq!(def.name, "json-source");
    let SourceConfig::Fixtures { path, batch_size } = &def.source else {
        panic!("expected a fixture source");
    };
    assert_eq!(path, &std::path::PathBuf::from("/data/fixtures.json"));
    assert_eq!(*batch_size, Some(2));
}

#[test]
fn test_load_missing_file() {
    let err = load_datasource("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, crate::error::Error::FileNotFound { .. }));
}

#[test]
fn test_cursor_pagination_rejects_total_count() {
    let yaml = r#"
name: api
source:
  type: rest
  base_url: https://api.example.com
  pagination:
    type: cursor
    cursor_param: after
    cursor_path: $.next
    stop_condition:
      type: total_count
      path: $.total
entities:
  - id: users
    external_id: users
"#;
    let err = load_datasource_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("total_count"));

    let accepted = yaml.replace("type: total_count\n      path: $.total", "type: empty_page");
    assert!(load_datasource_from_str(&accepted).is_ok());
}
