//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the snykapi binary.

use clap::{Parser, Subcommand};

/// Snyk API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "snykapi", about = "Snyk API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Log requests and pages to stderr.
    #[arg(long, short, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every record of a resource, following pagination.
    List {
        /// Registry name of the resource, e.g. `orgs` or `targets`.
        resource: String,

        /// Organization id for org-scoped resources.
        #[arg(long, env = "SNYK_ORG_ID")]
        org: Option<String>,

        /// Records per page (v1 offset pagination).
        #[arg(long)]
        per_page: Option<u32>,

        /// Records per page (REST cursor pagination).
        #[arg(long)]
        limit: Option<u32>,

        /// Extra query parameter, repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },

    /// Get a single record by id.
    Get {
        /// Registry name of the resource.
        resource: String,

        /// Record id.
        id: String,

        /// Organization id for org-scoped resources.
        #[arg(long, env = "SNYK_ORG_ID")]
        org: Option<String>,
    },

    /// Show the user owning the token.
    Me,

    /// List the resources known to the client.
    Resources,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
