// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Strength Analytics
//!
//! A batch aggregation engine for strength-training logs. It turns a history
//! of finished workouts into per-exercise and per-month analytics.
//!
//! ## Features
//!
//! - **e1RM tracking**: Epley estimates with a running maximum per exercise
//! - **Personal records**: best set per rep range (1RM through 15RM)
//! - **Intensity and effort**: intensity histograms and effective reps from inferred RPE
//! - **Temporal signals**: exercise staleness and plateau detection over recent history
//! - **Muscle balance**: push/pull and quad/hamstring strength ratios per month
//! - **Legacy data**: both the current `sets` entry shape and the old parallel arrays
//!
//! ## Architecture
//!
//! - **Models**: raw and validated workout documents, analytics records
//! - **Analytics**: resolvers, calculators, detectors and the run engine
//! - **Storage**: the store trait with in-memory and SQLite implementations
//! - **Config**: tunable heuristics and runner environment
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use strength_analytics::analytics::AnalyticsEngine;
//! use strength_analytics::config::AnalyticsConfig;
//! use strength_analytics::database::Database;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AnalyticsConfig::load(None)?;
//!     let database = Database::new("sqlite:./data/workouts.db").await?;
//!
//!     let summary = AnalyticsEngine::new(&database, &config).run().await?;
//!     println!("Wrote {} exercise records", summary.exercise_records);
//!
//!     Ok(())
//! }
//! ```

/// Workout documents and analytics records
pub mod models;

/// Configuration management
pub mod config;

/// Named heuristic defaults and environment accessors
pub mod constants;

/// The aggregation engine
pub mod analytics;

/// Store abstraction and in-memory implementation
pub mod storage;

/// SQLite document store
pub mod database;

/// Production logging and structured output
pub mod logging;
