//! unitdesk - terminal console for the personnel, unit, position and
//! vehicle management backend.
//!
//! Every data command goes through one `DataService`, so repeated reads
//! within a command are served from its caches and writes invalidate what
//! they touch. `config` only reads and writes the config file.

mod cli;
mod output;

use std::io;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use unitdesk_core::api::{Departments, Employees, EntryExitRequests, Positions, Vehicles};
use unitdesk_core::{ApiClient, Config, DataService, ResourceKind, SharedError};

use cli::{Cli, Command};
use output::print_rows;

type Service = DataService<ApiClient>;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Cached reads share one error between callers; flatten it with its
/// context chain for reporting.
fn shared(err: SharedError) -> anyhow::Error {
    anyhow!("{:#}", err)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    info!("unitdesk starting");

    let connect = || -> Result<Service> {
        let mut config = Config::load()?;
        if let Some(url) = &cli.api_url {
            config.api_url = url.clone();
        }
        DataService::from_config(&config)
    };

    match cli.command {
        Command::List { resource } => list(&connect()?, resource, cli.json).await,
        Command::Search { query } => {
            let hits = connect()?.search_employees(&query).await.map_err(shared)?;
            print_rows(&hits, cli.json)
        }
        Command::Positions { parent } => {
            let children = connect()?
                .child_positions(parent.as_deref())
                .await
                .map_err(shared)?;
            print_rows(&children, cli.json)
        }
        Command::Delete { resource, id } => {
            delete(&connect()?, resource, &id).await?;
            eprintln!("Deleted {} {}", resource, id);
            Ok(())
        }
        Command::Status => status(&connect()?, cli.json).await,
        Command::Config {
            set_api_url,
            cache_ttl,
            timeout,
        } => configure(set_api_url, cache_ttl, timeout),
    }
}

/// Print the stored configuration, saving the given settings first.
fn configure(api_url: Option<String>, cache_ttl: Option<u64>, timeout: Option<u64>) -> Result<()> {
    let mut config = Config::load_file()?;
    let changed = api_url.is_some() || cache_ttl.is_some() || timeout.is_some();

    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(secs) = cache_ttl {
        config.cache_ttl_secs = secs;
    }
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }

    if changed {
        let path = config.save()?;
        info!(path = %path.display(), "Configuration saved");
        eprintln!("Saved configuration to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn list(service: &Service, kind: ResourceKind, json: bool) -> Result<()> {
    match kind {
        ResourceKind::Departments => print_rows(&service.departments().await.map_err(shared)?, json),
        ResourceKind::Positions => print_rows(&service.positions().await.map_err(shared)?, json),
        ResourceKind::Employees => print_rows(&service.employees().await.map_err(shared)?, json),
        ResourceKind::Vehicles => print_rows(&service.vehicles().await.map_err(shared)?, json),
        ResourceKind::EntryExitRequests => {
            print_rows(&service.entry_exit_requests().await.map_err(shared)?, json)
        }
    }
}

async fn delete(service: &Service, kind: ResourceKind, id: &str) -> Result<()> {
    match kind {
        ResourceKind::Departments => service.delete::<Departments>(id).await,
        ResourceKind::Positions => service.delete::<Positions>(id).await,
        ResourceKind::Employees => service.delete::<Employees>(id).await,
        ResourceKind::Vehicles => service.delete::<Vehicles>(id).await,
        ResourceKind::EntryExitRequests => service.delete::<EntryExitRequests>(id).await,
    }
}

/// Load all collections concurrently, then report each cache. A collection
/// that fails to load shows as empty; the errors are reported after the table.
async fn status(service: &Service, json: bool) -> Result<()> {
    let (departments, positions, employees, vehicles, requests) = tokio::join!(
        service.departments(),
        service.positions(),
        service.employees(),
        service.vehicles(),
        service.entry_exit_requests(),
    );

    let failures: Vec<(ResourceKind, SharedError)> = [
        (ResourceKind::Departments, departments.err()),
        (ResourceKind::Positions, positions.err()),
        (ResourceKind::Employees, employees.err()),
        (ResourceKind::Vehicles, vehicles.err()),
        (ResourceKind::EntryExitRequests, requests.err()),
    ]
    .into_iter()
    .filter_map(|(kind, err)| err.map(|err| (kind, err)))
    .collect();

    print_rows(&service.cache_status(), json)?;

    for (kind, err) in &failures {
        eprintln!("{}: {:#}", kind, err);
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} of {} collections failed to load", failures.len(), ResourceKind::ALL.len()))
    }
}
