// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Analytics Module
//!
//! The in-memory aggregation engine that turns finished workout logs into
//! per-exercise and per-month strength analytics.
//!
//! This module includes:
//! - Metadata and bodyweight resolution with run-scoped caches
//! - Set-level load, e1RM, intensity and rep-range calculation
//! - Effective-rep estimation from inferred RPE
//! - Staleness scoring and plateau detection over a recent-history window
//! - Muscle balance ratios
//! - The merge protocol for exercise and monthly accumulators
//! - The three-pass run (read, compute, write)

pub mod aggregator;
pub mod balance;
pub mod effective_reps;
pub mod engine;
pub mod history;
pub mod plateau;
pub mod resolver;
pub mod set_calculator;
pub mod staleness;

pub use engine::{aggregate_user, AnalyticsEngine, ComputedRun, RunSummary};
pub use history::{group_by_user, HistoryWindow, UserHistory};
pub use resolver::{BodyweightResolver, MetadataLookup, MetadataResolver};
pub use set_calculator::WorkoutExerciseStats;

/// Errors raised inside a calculator; callers degrade to a neutral result
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid analytics input: {0}")]
    InvalidData(String),

    #[error("Analytics computation failed: {0}")]
    ComputationError(String),
}
