// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Logging setup and structured run events.
//!
//! Log lines go to stderr so the binaries can print their JSON summaries on
//! stdout.

use anyhow::Result;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::constants::service;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for collected production logs
    Json,
    /// Human-readable lines for local runs
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not a valid filter
    pub level: String,
    pub format: LogFormat,
    pub service_name: String,
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            service_name: service::SERVICE_NAME.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `SERVICE_NAME` and `ENVIRONMENT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; production defaults to JSON output
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let environment = lookup("ENVIRONMENT").unwrap_or(defaults.environment);

        let format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            _ if environment == "production" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            level: lookup("RUST_LOG").unwrap_or(defaults.level),
            format,
            service_name: lookup("SERVICE_NAME").unwrap_or(defaults.service_name),
            environment,
        }
    }

    /// Install the global subscriber
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));

        let (json, pretty) = match self.format {
            LogFormat::Json => (Some(fmt::layer().json().with_writer(io::stderr)), None),
            LogFormat::Pretty => (None, Some(fmt::layer().with_writer(io::stderr))),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json)
            .with(pretty)
            .try_init()?;

        info!(
            service.name = %self.service_name,
            service.version = %service::SERVICE_VERSION,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );

        Ok(())
    }
}

/// Initialize logging from environment
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Application-specific logging utilities
pub struct AppLogger;

impl AppLogger {
    /// Log the start of an aggregation run
    pub fn log_run_started(run_id: &str, logs: usize, users: usize) {
        info!(
            run.id = %run_id,
            run.logs = %logs,
            run.users = %users,
            "Aggregation run started"
        );
    }

    /// Log the outcome of an aggregation run
    pub fn log_run_completed(run_id: &str, exercise_records: usize, monthly_records: usize, failed_users: usize, duration_ms: u64) {
        info!(
            run.id = %run_id,
            run.exercise_records = %exercise_records,
            run.monthly_records = %monthly_records,
            run.failed_users = %failed_users,
            run.duration_ms = %duration_ms,
            "Aggregation run completed"
        );
    }

    /// Log a workout log rejected during ingestion
    pub fn log_skipped_log(log_id: &str, reason: &str) {
        warn!(
            log.id = %log_id,
            skip.reason = %reason,
            "Skipping workout log"
        );
    }

    /// Log a reference that resolved to defaults
    pub fn log_missing_reference(kind: &str, id: &str) {
        warn!(
            reference.kind = %kind,
            reference.id = %id,
            "Reference not found, using defaults"
        );
    }

    /// Log a detector falling back to its neutral result
    /// `subject` is the exercise id, or the log id for per-workout computations
    pub fn log_computation_fallback(detector: &str, user_id: &str, subject: &str, error: &str) {
        warn!(
            detector = %detector,
            user.id = %user_id,
            detector.subject = %subject,
            error = %error,
            "Detector failed, using neutral result"
        );
    }

    /// Log a per-user batch write
    pub fn log_batch_write(user_id: &str, records: usize, success: bool, duration_ms: u64) {
        if success {
            info!(
                user.id = %user_id,
                batch.records = %records,
                batch.duration_ms = %duration_ms,
                "Analytics batch written"
            );
        } else {
            warn!(
                user.id = %user_id,
                batch.records = %records,
                batch.duration_ms = %duration_ms,
                "Analytics batch write failed"
            );
        }
    }

    /// Log database operations
    pub fn log_database_operation(operation: &str, table: &str, success: bool, duration_ms: u64) {
        info!(
            db.operation = %operation,
            db.table = %table,
            db.success = %success,
            db.duration_ms = %duration_ms,
            "Database operation"
        );
    }
}
