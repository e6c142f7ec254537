use crate::models::error::{GatewayError, Result};
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub address: String,
    pub port: u16,
    pub queue_file: String,
    pub stream: String,
    pub database_file: String,
    pub backend_timeout_ms: u64,
    pub max_body_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 3080,
            queue_file: "queue.db".to_string(),
            stream: "log_stream".to_string(),
            database_file: "logs.db".to_string(),
            backend_timeout_ms: 5000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

pub fn setup_config(config_file: &str) -> Result<Config> {
    let config_path = PathBuf::from(config_file);
    info!("Loading config from: {}", config_path.display());

    let config_str = fs::read_to_string(&config_path).map_err(|cause| GatewayError::ConfigRead {
        path: config_path.clone(),
        cause,
    })?;

    serde_json::from_str(&config_str).map_err(|cause| GatewayError::ConfigParse {
        path: config_path,
        cause,
    })
}

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.stream.trim().is_empty() {
        return Err(GatewayError::InvalidConfig(
            "stream must not be empty".to_string(),
        ));
    }

    if config.backend_timeout_ms == 0 {
        return Err(GatewayError::InvalidConfig(
            "backend_timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.max_body_bytes == 0 {
        return Err(GatewayError::InvalidConfig(
            "max_body_bytes must be greater than 0".to_string(),
        ));
    }

    validate_database_path("queue_file", &config.queue_file)?;
    validate_database_path("database_file", &config.database_file)?;

    if config.queue_file == config.database_file && !is_in_memory(&config.queue_file) {
        warn!(
            "Queue and store share the database file {}; they will contend for the same write lock",
            config.queue_file
        );
    }

    Ok(())
}

fn validate_database_path(name: &str, db_file: &str) -> Result<()> {
    if db_file.trim().is_empty() {
        return Err(GatewayError::InvalidConfig(format!(
            "{} cannot be empty. Provide a valid path or use ':memory:' for an in-memory database.",
            name
        )));
    }

    if is_in_memory(db_file) {
        return Ok(());
    }

    if let Some(parent) = Path::new(db_file).parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(GatewayError::InvalidConfig(format!(
                "{} directory does not exist: {}",
                name,
                parent.display()
            )));
        }
    }

    Ok(())
}

pub fn is_in_memory(db_file: &str) -> bool {
    db_file == ":memory:" || db_file.starts_with("file::memory:")
}
