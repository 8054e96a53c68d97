//! Parser for datasource definitions
//!
//! Parses and validates datasource YAML or JSON files.

use crate::config::{
    DatasourceConfig, PaginationDefinition, SourceConfig, StopConditionDefinition,
};
use crate::error::{Error, Result};
use crate::planner;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a datasource definition from a file.
///
/// Files ending in `.json` are parsed as JSON, anything else as YAML. A
/// relative fixture path is resolved against the directory of the file.
pub fn load_datasource(path: impl AsRef<Path>) -> Result<DatasourceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read datasource file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut def: DatasourceConfig = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse datasource JSON: {e}")))?
    } else {
        parse_yaml(&content)?
    };

    if let (SourceConfig::Fixtures { path: fixtures, .. }, Some(dir)) =
        (&mut def.source, path.parent())
    {
        if fixtures.is_relative() {
            *fixtures = dir.join(&*fixtures);
        }
    }

    validate_datasource(&def)?;
    debug!(
        "Loaded datasource '{}' with {} entities from {}",
        def.name,
        def.entities.len(),
        path.display()
    );
    Ok(def)
}

/// Load a datasource definition from a YAML (or JSON) string
pub fn load_datasource_from_str(content: &str) -> Result<DatasourceConfig> {
    let def = parse_yaml(content)?;
    validate_datasource(&def)?;
    Ok(def)
}

fn parse_yaml(content: &str) -> Result<DatasourceConfig> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::config(format!("Failed to parse datasource YAML: {e}")))
}

/// Validate a datasource definition
pub fn validate_datasource(def: &DatasourceConfig) -> Result<()> {
    if def.name.trim().is_empty() {
        return Err(Error::config("Datasource name cannot be empty"));
    }

    if def.max_page_size == 0 {
        return Err(Error::invalid_value("max_page_size", "must be at least 1"));
    }
    if def.upstream_page_size == 0 {
        return Err(Error::invalid_value(
            "upstream_page_size",
            "must be at least 1",
        ));
    }
    if def.max_concurrency == 0 {
        return Err(Error::invalid_value("max_concurrency", "must be at least 1"));
    }

    let mut accounts = HashSet::new();
    for account in &def.accounts {
        if account.trim().is_empty() {
            return Err(Error::invalid_value("accounts", "account names cannot be empty"));
        }
        if !accounts.insert(account.as_str()) {
            return Err(Error::invalid_value(
                "accounts",
                format!("duplicate account '{account}'"),
            ));
        }
    }

    validate_source(&def.source)?;

    if def.entities.is_empty() {
        return Err(Error::config("Datasource must have at least one entity"));
    }

    let mut entity_ids = HashSet::new();
    for entity in &def.entities {
        if !entity_ids.insert(entity.id.as_str()) {
            return Err(Error::config(format!(
                "Duplicate entity id '{}'",
                entity.id
            )));
        }
        // Planning validates the entity and every template it uses
        planner::plan(entity, &def.accounts)?;
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<()> {
    match source {
        SourceConfig::Rest(rest) => {
            if rest.base_url.trim().is_empty() {
                return Err(Error::config("REST source base_url cannot be empty"));
            }
            url::Url::parse(&rest.base_url)?;
            if rest.timeout_ms == 0 {
                return Err(Error::invalid_value("source.timeout_ms", "must be positive"));
            }
            if rest
                .rate_limit
                .is_some_and(|limit| limit.requests_per_second == 0)
            {
                return Err(Error::invalid_value(
                    "source.rate_limit.requests_per_second",
                    "must be positive",
                ));
            }
            // Cursor tokens carry no position, so a total can never be reached
            if let PaginationDefinition::Cursor {
                stop_condition: Some(StopConditionDefinition::TotalCount { .. }),
                ..
            } = &rest.pagination
            {
                return Err(Error::invalid_value(
                    "source.pagination.stop_condition",
                    "total_count is not supported with cursor pagination",
                ));
            }
        }
        SourceConfig::Fixtures { path, batch_size } => {
            if path.as_os_str().is_empty() {
                return Err(Error::missing_field("source.path"));
            }
            if *batch_size == Some(0) {
                return Err(Error::invalid_value("source.batch_size", "must be positive"));
            }
        }
    }
    Ok(())
}
