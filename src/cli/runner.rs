//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{DatasourceConfig, PageRequest};
use crate::connector::Connector;
use crate::cursor;
use crate::error::{Error, Result};
use crate::loader::load_datasource;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Page {
                entity,
                page_size,
                cursor,
                accounts,
                timeout_ms,
            } => {
                self.page(
                    entity,
                    *page_size,
                    cursor.as_deref(),
                    accounts.clone(),
                    *timeout_ms,
                )
                .await
            }
            Commands::Drain {
                entity,
                page_size,
                max_pages,
            } => self.drain(entity, *page_size, *max_pages).await,
            Commands::Plan { entity } => self.plan(entity.as_deref()),
            Commands::Cursor { cursor } => self.cursor(cursor),
            Commands::Entities => self.entities(),
            Commands::Validate => self.validate(),
            Commands::Serve { port } => {
                let config = crate::cli::ServerConfig {
                    datasource: self.datasource_path()?,
                };
                crate::cli::serve(config, *port).await
            }
        }
    }

    fn datasource_path(&self) -> Result<PathBuf> {
        self.cli
            .datasource
            .clone()
            .ok_or_else(|| Error::config("Datasource file not specified (use -d flag)"))
    }

    /// Load datasource definition
    fn load_datasource(&self) -> Result<DatasourceConfig> {
        load_datasource(self.datasource_path()?)
    }

    fn connector(&self) -> Result<Connector> {
        Connector::from_definition(&self.load_datasource()?)
    }

    async fn page(
        &self,
        entity_id: &str,
        page_size: usize,
        cursor: Option<&str>,
        accounts: Option<Vec<String>>,
        timeout_ms: Option<u64>,
    ) -> Result<()> {
        let connector = self.connector()?;
        let entity = connector.entity(entity_id)?.clone();

        let mut request = PageRequest::new(entity, page_size).with_cursor(cursor.unwrap_or_default());
        if let Some(accounts) = accounts {
            request = request.with_accounts(accounts);
        }
        if let Some(ms) = timeout_ms {
            request = request.with_timeout(Duration::from_millis(ms));
        }

        let (page, stats) = connector.get_page_with_stats(&request).await?;
        self.output_message(&json!({
            "type": "PAGE",
            "entity": entity_id,
            "objects": page.objects,
            "nextCursor": page.next_cursor,
            "stats": stats,
        }));
        Ok(())
    }

    async fn drain(&self, entity_id: &str, page_size: usize, max_pages: Option<usize>) -> Result<()> {
        let connector = self.connector()?;
        let entity = connector.entity(entity_id)?.clone();

        let mut request = PageRequest::new(entity, page_size);
        let mut pages = 0;
        let mut objects = 0;
        let mut dropped = 0;
        let complete = loop {
            if max_pages.is_some_and(|max| pages >= max) {
                break false;
            }
            let (page, stats) = connector.get_page_with_stats(&request).await?;
            pages += 1;
            objects += page.objects.len();
            dropped += stats.dropped_records;

            for object in &page.objects {
                self.output_message(&json!({
                    "type": "OBJECT",
                    "entity": entity_id,
                    "object": object,
                }));
            }
            if page.is_last() {
                break true;
            }
            request.cursor = page.next_cursor;
        };

        let mut summary = json!({
            "type": "SUMMARY",
            "entity": entity_id,
            "pages": pages,
            "objects": objects,
            "dropped_records": dropped,
            "complete": complete,
        });
        if !complete {
            summary["nextCursor"] = Value::String(request.cursor);
        }
        self.output_message(&summary);
        Ok(())
    }

    fn plan(&self, entity_id: Option<&str>) -> Result<()> {
        let connector = self.connector_without_source()?;
        let entities: Vec<_> = match entity_id {
            Some(id) => vec![connector.entity(id)?],
            None => connector.entities().iter().collect(),
        };

        for entity in entities {
            let plan = connector.plan(entity, None)?;
            self.output_message(&json!({
                "type": "PLAN",
                "entity": entity.id,
                "plan": plan,
            }));
        }
        Ok(())
    }

    fn cursor(&self, encoded: &str) -> Result<()> {
        let decoded = cursor::decode(encoded)?;
        self.output_message(&json!({
            "type": "CURSOR",
            "start": decoded.is_start(),
            "kind": decoded.frame.as_ref().map(|f| f.kind()),
            "cursor": cursor::to_json(&decoded)?,
        }));
        Ok(())
    }

    fn entities(&self) -> Result<()> {
        let connector = self.connector_without_source()?;
        self.output_message(&json!({
            "type": "ENTITIES",
            "datasource": connector.name(),
            "entities": connector.describe()?,
        }));
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let def = self.load_datasource()?;
        self.output_message(&json!({
            "type": "VALIDATE",
            "valid": true,
            "datasource": def.name,
            "entities": def.entities.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            "accounts": def.accounts,
        }));
        Ok(())
    }

    /// Plans and listings need the definition only, not a reachable source
    fn connector_without_source(&self) -> Result<Connector> {
        let def = self.load_datasource()?;
        let paginator = crate::pagination::InMemoryPaginator::new();
        let mut connector = Connector::new(std::sync::Arc::new(paginator))
            .with_name(&def.name)
            .with_accounts(def.accounts.clone());
        for entity in &def.entities {
            connector = connector.with_entity(entity.clone());
        }
        Ok(connector)
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
