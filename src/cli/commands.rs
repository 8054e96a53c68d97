//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SoR connector kit CLI
#[derive(Parser, Debug)]
#[command(name = "sor-cdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Datasource definition file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub datasource: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one page of an entity
    Page {
        /// Entity id
        entity: String,

        /// Maximum objects in the page
        #[arg(long, default_value = "100")]
        page_size: usize,

        /// Cursor returned by the previous page
        #[arg(long)]
        cursor: Option<String>,

        /// Accounts overriding the datasource list (comma-separated)
        #[arg(long, value_delimiter = ',')]
        accounts: Option<Vec<String>>,

        /// Request deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Page an entity to exhaustion, one object per line
    Drain {
        /// Entity id
        entity: String,

        /// Objects per page
        #[arg(long, default_value = "100")]
        page_size: usize,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Show the traversal plan of one or all entities
    Plan {
        /// Entity id (all entities when omitted)
        entity: Option<String>,
    },

    /// Decode a cursor
    Cursor {
        /// Encoded cursor
        cursor: String,
    },

    /// List served entities
    Entities,

    /// Validate datasource definition
    Validate,

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
