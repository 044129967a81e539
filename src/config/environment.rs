// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration for the runner binaries

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use crate::constants::env_config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Database URL (SQLite path)
    pub database_url: String,
    /// Optional path to an analytics TOML file
    pub analytics_config_path: Option<String>,
    /// Documents per page for the completedDate backfill
    pub backfill_batch_size: u32,
    /// Log level
    pub log_level: String,
}

impl RunnerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenv::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let backfill_batch_size = match env::var("BACKFILL_BATCH_SIZE") {
            Ok(value) => value
                .parse()
                .context("Invalid BACKFILL_BATCH_SIZE value")?,
            Err(_) => env_config::backfill_batch_size(),
        };

        let config = RunnerConfig {
            database_url: env_config::database_url(),
            analytics_config_path: env_config::analytics_config_path(),
            backfill_batch_size,
            log_level: env_config::log_level(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL cannot be empty"));
        }
        if self.backfill_batch_size == 0 {
            return Err(anyhow::anyhow!("BACKFILL_BATCH_SIZE must be positive"));
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Strength Analytics Configuration:\n\
             - Database: {}\n\
             - Analytics config: {}\n\
             - Backfill batch size: {}\n\
             - Log Level: {}",
            if self.database_url.starts_with("sqlite:") { "SQLite" } else { "External DB" },
            self.analytics_config_path.as_deref().unwrap_or("defaults"),
            self.backfill_batch_size,
            self.log_level,
        )
    }
}
