mod api_routes;
mod api_state;
mod models;
mod repo;
mod service;
mod utils;

#[cfg(test)]
mod test_support;

#[macro_use]
extern crate rocket;

use crate::api_state::AppState;
use crate::models::config::{setup_config, validate_config, Config};
use crate::models::queue_entry::EntryId;
use crate::repo::queue::SqliteQueue;
use crate::repo::sqlite::open_pool;
use crate::repo::store::SqliteLogStore;
use crate::repo::EventQueue;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "log-gateway")]
#[command(
    about = "HTTP gateway that queues log events and serves recent processed logs",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = "gateway.json",
        env = "GATEWAY_CONFIG"
    )]
    config_file: String,

    #[arg(long = "queue", env = "QUEUE_PATH")]
    queue_file: Option<String>,

    #[arg(long = "database", env = "DATABASE_PATH")]
    database_file: Option<String>,

    #[arg(short = 's', long = "stream", env = "STREAM_NAME")]
    stream: Option<String>,

    #[arg(short = 'a', long = "address", env = "ADDRESS")]
    address: Option<String>,

    #[arg(short = 'p', long = "port", env = "PORT")]
    port: Option<u16>,

    #[arg(short = 't', long = "backend-timeout-ms", env = "BACKEND_TIMEOUT_MS")]
    backend_timeout_ms: Option<u64>,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    #[arg(short = 'v', long = "validate-only")]
    validate_only: bool,

    /// Print queued entries as JSON lines and exit
    #[arg(long = "replay")]
    replay: bool,

    /// Only replay entries after this id
    #[arg(long = "after", requires = "replay")]
    after: Option<EntryId>,

    #[arg(long = "count", default_value_t = 100, requires = "replay")]
    count: usize,
}

fn parse_log_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

/// File values (when the file exists) overlaid with CLI/env values, then validated.
fn load_config(args: &Cli) -> models::error::Result<Config> {
    let config_file_path = args
        .config_file
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    let mut config = if Path::new(&config_file_path).exists() {
        setup_config(&config_file_path)?
    } else {
        info!(
            "No config file at {}, using defaults and command line values",
            config_file_path
        );
        Config::default()
    };

    if let Some(queue_file) = &args.queue_file {
        config.queue_file = queue_file.clone();
    }
    if let Some(database_file) = &args.database_file {
        config.database_file = database_file.clone();
    }
    if let Some(stream) = &args.stream {
        config.stream = stream.clone();
    }
    if let Some(address) = &args.address {
        config.address = address.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(backend_timeout_ms) = args.backend_timeout_ms {
        config.backend_timeout_ms = backend_timeout_ms;
    }

    validate_config(&config)?;
    Ok(config)
}

pub(crate) fn build_rocket(config: &Config, state: AppState) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.address.as_str()))
        .merge(("port", config.port));

    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                api_routes::ingest_event,
                api_routes::recent_logs,
                api_routes::gateway_stats,
                api_routes::health_check,
            ],
        )
        .attach(AdHoc::on_liftoff("Gateway ready", |rocket| {
            Box::pin(async move {
                info!(
                    "Log gateway listening on {}:{}",
                    rocket.config().address,
                    rocket.config().port
                );
            })
        }))
        .attach(AdHoc::on_shutdown("Release backends", |_| {
            Box::pin(async {
                info!("Log gateway shutting down, releasing queue and store connections");
            })
        }))
}

fn replay(
    queue: &dyn EventQueue,
    stream: &str,
    after: Option<EntryId>,
    count: usize,
) -> Result<()> {
    let entries = queue
        .read_after(stream, after, count)
        .context("Failed to read queued entries")?;
    info!("Replaying {} entries from stream {}", entries.len(), stream);

    for entry in entries {
        debug!(
            "Entry {} from '{}' admitted at {:?}",
            entry.id,
            entry.event().service,
            entry.admitted_at()
        );
        println!(
            "{}",
            serde_json::to_string(&entry).context("Failed to encode queued entry")?
        );
    }
    Ok(())
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(parse_log_level(&args.log_level))
        .format_timestamp_secs()
        .init();

    info!("log-gateway starting...");
    let config = load_config(&args).context("Failed to load configuration")?;
    debug!("Loaded config: {:?}", &config);

    if args.validate_only {
        info!("Configuration is valid. Exiting (--validate-only mode).");
        return Ok(());
    }

    let queue_pool = open_pool(&config.queue_file, config.backend_timeout())
        .context("Failed to open queue database")?;
    let queue = Arc::new(SqliteQueue::new(queue_pool).context("Failed to set up queue schema")?);

    if args.replay {
        return replay(queue.as_ref(), &config.stream, args.after, args.count);
    }

    let store_pool = open_pool(&config.database_file, config.backend_timeout())
        .context("Failed to open log store database")?;
    let store =
        Arc::new(SqliteLogStore::new(store_pool).context("Failed to set up log store schema")?);

    info!(
        "Queue: {} (stream {}), store: {}",
        config.queue_file, config.stream, config.database_file
    );
    let state = AppState::new(queue, store, &config);
    build_rocket(&config, state).launch().await?;

    Ok(())
}
