//! Snyk API CLI binary.
//!
//! A command-line interface for listing and inspecting Snyk resources.

use clap::Parser;
use snykapi::cli::{Cli, Command};
use snykapi::output::{render_model, render_models, ResourceRow};
use snykapi::{ListQuery, SnykClient};
use std::process::ExitCode;
use tabled::Table;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        })
        .init();

    let client = match SnykClient::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set SNYK_TOKEN (and SNYK_API_VERSION for REST resources)");
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &SnykClient, cli: Cli) -> snykapi::Result<()> {
    match cli.command {
        Command::List {
            resource,
            org,
            per_page,
            limit,
            params,
        } => {
            let mut manager = client.manager(&resource)?;
            if let Some(org) = org {
                manager = manager.scoped("org_id", org);
            }
            let mut query = ListQuery::new();
            for (key, value) in params {
                query = query.param(key, value);
            }
            if let Some(per_page) = per_page {
                query = query.with_per_page(per_page);
            }
            if let Some(limit) = limit {
                query = query.with_limit(limit);
            }
            let models = manager.list(&query).await?;
            println!("{}", render_models(&models, cli.json));
        }
        Command::Get { resource, id, org } => {
            let mut manager = client.manager(&resource)?;
            if let Some(org) = org {
                manager = manager.scoped("org_id", org);
            }
            let model = manager.get(&id).await?;
            println!("{}", render_model(&model, cli.json));
        }
        Command::Me => {
            let me = client.me().await?;
            println!("{}", render_model(&me, cli.json));
        }
        Command::Resources => {
            let rows: Vec<ResourceRow> = client.registry().iter().map(ResourceRow::from).collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}
