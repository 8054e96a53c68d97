//! Connector façade
//!
//! Owns a record source, the path resolver and the entities of a datasource,
//! and serves pages of normalized objects. This is the stateless request
//! surface: every call carries its own cursor and nothing is kept between
//! calls.

use crate::config::{DatasourceConfig, EntityConfig, PageRequest, SourceConfig};
use crate::engine::{AssemblyConfig, AssemblyStats, PageAssembler};
use crate::error::{Error, Result};
use crate::extract::{ExtractionConfig, JsonPathResolver, PathResolver};
use crate::http::RestPaginator;
use crate::pagination::{InMemoryPaginator, UpstreamPaginator};
use crate::planner::{self, PlanShape, TraversalPlan};
use crate::types::{Object, Page};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Largest page size accepted when none is configured
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

// ============================================================================
// Entity Summary (for listing)
// ============================================================================

/// Summary of one served entity
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    /// Entity id
    pub id: String,

    /// How the entity is traversed
    pub shape: PlanShape,

    /// Number of frame stacks per account
    pub branches: usize,

    /// Attribute ids
    pub attributes: Vec<String>,

    /// Child entity ids
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_entities: Vec<String>,
}

// ============================================================================
// Connector
// ============================================================================

/// Serves pages of one datasource
#[derive(Clone)]
pub struct Connector {
    name: String,
    paginator: Arc<dyn UpstreamPaginator>,
    resolver: Arc<dyn PathResolver>,
    assembly: AssemblyConfig,
    accounts: Vec<String>,
    entities: Vec<EntityConfig>,
    max_page_size: usize,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.name)
            .field("accounts", &self.accounts)
            .field("entities", &self.entities.len())
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Create a connector over a record source
    pub fn new(paginator: Arc<dyn UpstreamPaginator>) -> Self {
        Self {
            name: "datasource".to_string(),
            paginator,
            resolver: Arc::new(JsonPathResolver),
            assembly: AssemblyConfig::default(),
            accounts: Vec::new(),
            entities: Vec::new(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            timeout: None,
        }
    }

    /// Set the datasource name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the path resolver
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set assembly settings
    #[must_use]
    pub fn with_assembly(mut self, assembly: AssemblyConfig) -> Self {
        self.assembly = assembly;
        self
    }

    /// Set the default account fan-out list
    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Serve an entity
    #[must_use]
    pub fn with_entity(mut self, entity: EntityConfig) -> Self {
        self.entities.push(entity);
        self
    }

    /// Set the largest accepted page size
    #[must_use]
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max.max(1);
        self
    }

    /// Set the default per-request deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a connector from a loaded datasource definition
    pub fn from_definition(def: &DatasourceConfig) -> Result<Self> {
        let paginator: Arc<dyn UpstreamPaginator> = match &def.source {
            SourceConfig::Rest(rest) => Arc::new(RestPaginator::from_config(rest)?),
            SourceConfig::Fixtures { path, batch_size } => {
                let mut paginator = InMemoryPaginator::from_file(path)?;
                if let Some(size) = batch_size {
                    paginator = paginator.with_batch_size(*size);
                }
                Arc::new(paginator)
            }
        };

        let mut extraction =
            ExtractionConfig::default().with_bool_tokens(def.bool_tokens.clone());
        for format in &def.datetime_formats {
            extraction = extraction.with_datetime_format(format);
        }
        let assembly = AssemblyConfig::new()
            .with_upstream_page_size(def.upstream_page_size)
            .with_max_concurrency(def.max_concurrency)
            .with_extraction(extraction)
            .with_variables(def.variables.clone());

        let mut connector = Self::new(paginator)
            .with_name(&def.name)
            .with_assembly(assembly)
            .with_accounts(def.accounts.clone())
            .with_max_page_size(def.max_page_size);
        connector.entities.clone_from(&def.entities);
        connector.timeout = def.request_timeout();

        info!(
            "Datasource '{}' ready with {} entities over {} account(s)",
            connector.name,
            connector.entities.len(),
            connector.accounts.len().max(1)
        );
        Ok(connector)
    }

    /// Load a datasource file and build its connector
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let def = crate::loader::load_datasource(path)?;
        Self::from_definition(&def)
    }

    /// Datasource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default account list
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Served entities
    pub fn entities(&self) -> &[EntityConfig] {
        &self.entities
    }

    /// Look up a served entity
    pub fn entity(&self, id: &str) -> Result<&EntityConfig> {
        self.entities
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::config(format!("Unknown entity '{id}'")))
    }

    /// Summaries of every served entity
    pub fn describe(&self) -> Result<Vec<EntitySummary>> {
        self.entities
            .iter()
            .map(|entity| {
                let plan = planner::plan(entity, &self.accounts)?;
                Ok(EntitySummary {
                    id: entity.id.clone(),
                    shape: plan.branches.first().map_or(PlanShape::Flat, |b| b.shape),
                    branches: plan.branches.len(),
                    attributes: entity.attributes.iter().map(|a| a.id.clone()).collect(),
                    child_entities: entity.child_entities.iter().map(|c| c.id.clone()).collect(),
                })
            })
            .collect()
    }

    /// Plan an entity against the default or given accounts
    pub fn plan<'a>(
        &self,
        entity: &'a EntityConfig,
        accounts: Option<&[String]>,
    ) -> Result<TraversalPlan<'a>> {
        planner::plan(entity, accounts.unwrap_or(&self.accounts))
    }

    /// Serve one page
    pub async fn get_page(&self, request: &PageRequest) -> Result<Page> {
        self.get_page_with_stats(request)
            .await
            .map(|(page, _)| page)
    }

    /// Serve one page and report what it took
    pub async fn get_page_with_stats(&self, request: &PageRequest) -> Result<(Page, AssemblyStats)> {
        if request.page_size == 0 || request.page_size > self.max_page_size {
            return Err(Error::invalid_value(
                "page_size",
                format!(
                    "must be between 1 and {}, got {}",
                    self.max_page_size, request.page_size
                ),
            ));
        }

        let plan = self.plan(&request.entity, request.accounts.as_deref())?;
        let mut assembler = PageAssembler::new(
            &plan,
            self.paginator.as_ref(),
            self.resolver.as_ref(),
            &self.assembly,
        );
        if let Some(timeout) = request.timeout.or(self.timeout) {
            assembler = assembler.with_timeout(timeout);
        }

        let page = assembler.assemble(&request.cursor, request.page_size).await?;
        let stats = assembler.stats().clone();
        debug!(
            "Served {} '{}' objects ({} dropped, {} upstream calls)",
            page.objects.len(),
            request.entity.id,
            stats.dropped_records,
            stats.upstream_calls
        );
        Ok((page, stats))
    }

    /// Page through an entity until the traversal completes
    pub async fn collect_all(&self, entity: &EntityConfig, page_size: usize) -> Result<Vec<Object>> {
        let mut objects = Vec::new();
        let mut request = PageRequest::new(entity.clone(), page_size);
        loop {
            let page = self.get_page(&request).await?;
            objects.extend(page.objects);
            if page.next_cursor.is_empty() {
                return Ok(objects);
            }
            request.cursor = page.next_cursor;
        }
    }
}
