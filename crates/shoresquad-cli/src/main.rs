//! ShoreSquad host - runs the offline cache manager outside a browser.
//!
//! Each subcommand plays the part of the browser runtime for one trigger:
//! install/activate a version, route a request, deliver a push, or click a
//! notification. Cache generations live on disk between runs.

mod cli;
mod config;
mod host;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shoresquad_core::{
    CacheStorage, Clients, HttpNetwork, Method, Network, Notification, PushPayload, Request,
    RequestMode, Response, ServiceWorker, WorkerConfig,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use config::Config;
use host::{TerminalClients, TerminalNotifier};

/// Log file name inside the configured log directory
const LOG_FILE_PREFIX: &str = "shoresquad.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file when dropped.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(version = %config.worker.cache_version, origin = %config.worker.origin, "ShoreSquad host starting");

    match cli.command {
        Commands::Init => {
            config.save(cli.config.as_deref())?;
            println!("Configuration written");
            Ok(())
        }
        Commands::Install { no_activate } => install(&config, no_activate).await,
        Commands::Fetch { url, method, no_cors } => fetch(&config, &url, &method, no_cors).await,
        Commands::Push { payload } => push(&config, payload.as_deref()).await,
        Commands::Click { windows } => click(&config, &windows).await,
        Commands::Status => status(&config).await,
    }
}

async fn open_storage(config: &Config) -> Result<CacheStorage> {
    let dir = config.cache_dir()?;
    CacheStorage::open_dir(&dir)
        .await
        .with_context(|| format!("Failed to open cache storage at {}", dir.display()))
}

fn http_network(config: &Config) -> Result<Arc<HttpNetwork>> {
    let origin = config.worker.origin_url()?;
    Ok(Arc::new(HttpNetwork::new(origin)?))
}

fn build_worker(
    config: WorkerConfig,
    storage: CacheStorage,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
) -> Result<ServiceWorker> {
    let worker = ServiceWorker::new(
        config,
        storage,
        network,
        Arc::new(TerminalNotifier),
        clients,
    )?;
    Ok(worker)
}

async fn install(config: &Config, no_activate: bool) -> Result<()> {
    let storage = open_storage(config).await?;
    let worker = build_worker(config.worker.clone(), storage, http_network(config)?, Arc::new(TerminalClients::new(&[])))?;

    let report = worker.install().await.context("Install failed")?;
    println!("Installed {} ({} entries)", report.cache_name, report.cached.len());
    for key in &report.cached {
        println!("  {}", key);
    }

    // skipWaiting: go straight on to activation
    if no_activate || !worker.skip_waiting_requested() {
        println!("Waiting to activate");
        return Ok(());
    }

    let report = worker.activate().await.context("Activation failed")?;
    println!("Activated {}", worker.cache_name());
    for name in &report.deleted {
        println!("  deleted {}", name);
    }
    for name in &report.failed {
        println!("  could not delete {}", name);
    }
    Ok(())
}

async fn fetch(config: &Config, target: &str, method: &str, no_cors: bool) -> Result<()> {
    let url = config.worker.resolve(target)?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))?;
    let mode = if no_cors { RequestMode::NoCors } else { RequestMode::Cors };
    let request = Request::new(method, url).with_mode(mode);

    let storage = open_storage(config).await?;
    let network = http_network(config)?;

    // Pages are only controlled once some version has activated
    let Some(controlling) = controlling_config(&config.worker, &storage).await else {
        warn!("No activated generation, request is not intercepted");
        let response = network.fetch(&request).await?;
        print_response("uncontrolled", &response);
        return Ok(());
    };
    if controlling.cache_version != config.worker.cache_version {
        info!(
            active = %controlling.cache_version,
            configured = %config.worker.cache_version,
            "Configured version is not active yet, serving from the active one"
        );
    }

    let worker = build_worker(controlling, storage, network.clone(), Arc::new(TerminalClients::new(&[])))?;
    let outcome = worker.handle_fetch(&request).await?;
    let source = outcome.source();
    match outcome.into_response() {
        Some(response) => print_response(source, &response),
        None => {
            let response = network.fetch(&request).await?;
            print_response(source, &response);
        }
    }

    worker.wait_for_background().await;
    Ok(())
}

/// Worker config for the version that controls pages: the last one to
/// activate, which may lag behind the configured version.
async fn controlling_config(config: &WorkerConfig, storage: &CacheStorage) -> Option<WorkerConfig> {
    let active = storage.active().await?;
    Some(WorkerConfig {
        cache_version: active,
        ..config.clone()
    })
}

fn print_response(source: &str, response: &Response) {
    println!(
        "{} {} {} ({}, {} bytes)",
        source,
        response.status,
        response.url,
        response.response_type,
        response.body.len()
    );
}

async fn push(config: &Config, payload: Option<&str>) -> Result<()> {
    let storage = open_storage(config).await?;
    let worker = build_worker(config.worker.clone(), storage, http_network(config)?, Arc::new(TerminalClients::new(&[])))?;
    worker.handle_push(payload.map(str::as_bytes)).await?;
    Ok(())
}

async fn click(config: &Config, windows: &[String]) -> Result<()> {
    let urls = windows
        .iter()
        .map(|w| config.worker.resolve(w))
        .collect::<Result<Vec<_>, _>>()?;

    let storage = open_storage(config).await?;
    let worker = build_worker(config.worker.clone(), storage, http_network(config)?, Arc::new(TerminalClients::new(&urls)))?;

    let notification = Notification::from_push(&config.worker.notifications, PushPayload::default());
    let outcome = worker.handle_notification_click(&notification).await?;
    info!(outcome = ?outcome, "Notification click handled");
    Ok(())
}

async fn status(config: &Config) -> Result<()> {
    let storage = open_storage(config).await?;
    let active = storage.active().await;
    let names = storage.keys().await;
    if names.is_empty() {
        println!("No cache generations");
        return Ok(());
    }

    for name in names {
        let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        let cache = storage.open(&name).await?;
        let entries = cache.entries().await;
        println!("{} {} ({} entries)", marker, name, entries.len());
        for entry in entries {
            println!(
                "    {} {} {} bytes, {}",
                entry.key,
                entry.response.status,
                entry.response.body.len(),
                entry.age_display()
            );
        }
    }
    Ok(())
}
