// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Named heuristic constants used by the aggregation engine, plus
//! environment-based configuration values for the runner binaries.
//! The heuristics here are the defaults behind [`crate::config::AnalyticsConfig`].

use std::env;

/// Service identity used in structured logs
pub mod service {
    /// Default service name
    pub const SERVICE_NAME: &str = "strength-analytics";

    /// Service version from Cargo.toml
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Environment-based configuration
pub mod env_config {
    use super::env;

    /// Get database URL from environment or default
    pub fn database_url() -> String {
        env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/workouts.db".to_string())
    }

    /// Get analytics config path from environment, if set
    pub fn analytics_config_path() -> Option<String> {
        env::var("ANALYTICS_CONFIG_PATH").ok()
    }

    /// Get backfill page size from environment or default
    pub fn backfill_batch_size() -> u32 {
        env::var("BACKFILL_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(super::storage::DEFAULT_BACKFILL_BATCH_SIZE)
    }

    /// Get log level from environment or default
    pub fn log_level() -> String {
        env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string())
    }
}

/// Set-level load and strength estimation
pub mod strength {
    /// Denominator of the Epley estimate: `load * (1 + reps / EPLEY_DIVISOR)`
    pub const EPLEY_DIVISOR: f64 = 30.0;

    /// Width of an intensity histogram bucket, in percent
    pub const INTENSITY_BUCKET_WIDTH: i64 = 10;

    /// Inclusive rep bounds per rep-range label, checked in order
    pub const REP_RANGE_BOUNDS: [(&str, i32, i32); 6] = [
        ("1RM", 1, 1),
        ("3RM", 2, 3),
        ("5RM", 4, 5),
        ("8RM", 6, 8),
        ("12RM", 9, 12),
        ("15RM", 13, 20),
    ];
}

/// Perceived-effort estimation for effective reps
pub mod rpe {
    /// RPE to fraction-of-e1RM table, iterated in this order when searching
    pub const RPE_PERCENTAGE_TABLE: [(f64, f64); 7] = [
        (10.0, 1.00),
        (9.5, 0.97),
        (9.0, 0.94),
        (8.0, 0.91),
        (7.0, 0.88),
        (6.0, 0.85),
        (5.0, 0.82),
    ];

    /// RPE assigned when no e1RM is known
    pub const DEFAULT_RPE: f64 = 5.0;

    /// Minimum RPE at which reps count as effective
    pub const EFFECTIVE_RPE_THRESHOLD: f64 = 7.0;

    /// Percentage added per rep above the pivot
    pub const REP_CORRECTION_PER_REP: f64 = 0.02;

    /// Rep count above which the correction applies
    pub const REP_CORRECTION_PIVOT: i32 = 5;

    /// RPE at which the effective-rep multiplier reaches zero
    pub const MULTIPLIER_FLOOR_RPE: f64 = 6.0;

    /// RPE span over which the multiplier grows from zero to one
    pub const MULTIPLIER_RPE_SPAN: f64 = 4.0;

    /// Upper bound on the effective-rep multiplier.
    /// Unreachable: `(10 - 6) / 4` tops out at 1.0.
    pub const EFFECTIVE_MULTIPLIER_CAP: f64 = 2.0;
}

/// Windowed history detectors
pub mod history {
    /// Number of most recent logs examined by staleness and plateau detection
    pub const HISTORY_WINDOW: usize = 20;

    /// Data points compared for plateau detection
    pub const PLATEAU_POINTS: usize = 4;

    /// Maximum fractional distance from the window max for a plateau
    pub const PLATEAU_TOLERANCE: f64 = 0.02;

    /// Percent change separating improving/declining from stable
    pub const TREND_THRESHOLD_PERCENT: f64 = 2.0;
}

/// Staleness scoring
pub mod staleness {
    /// Score per day when a movement-pattern variation was found
    pub const VARIATION_DAY_MULTIPLIER: i64 = 2;

    /// Score per day when no variation was found
    pub const NO_VARIATION_DAY_MULTIPLIER: i64 = 3;

    /// Score ceiling
    pub const MAX_SCORE: i64 = 100;
}

/// Muscle group names used for balance ratios
pub mod muscle_groups {
    pub const PUSH_GROUPS: [&str; 3] = ["Chest", "Shoulders", "Triceps"];
    pub const PULL_GROUPS: [&str; 2] = ["Back", "Biceps"];
    pub const QUADRICEPS: &str = "Quadriceps";
    pub const HAMSTRINGS: &str = "Hamstrings";
}

/// Exercise reference values
pub mod exercises {
    /// Placeholder for any unresolved metadata field
    pub const UNKNOWN: &str = "Unknown";

    pub const BODYWEIGHT: &str = "Bodyweight";
    pub const BODYWEIGHT_LOADABLE: &str = "Bodyweight Loadable";

    /// Exercise names counted as compound lifts (compared case-insensitively)
    pub const COMPOUND_LIFTS: [&str; 12] = [
        "Squat",
        "Back Squat",
        "Front Squat",
        "Deadlift",
        "Romanian Deadlift",
        "Sumo Deadlift",
        "Bench Press",
        "Incline Bench Press",
        "Overhead Press",
        "Barbell Row",
        "Pull Up",
        "Chin Up",
    ];
}

/// Storage-side defaults
pub mod storage {
    /// Documents per backfill page, below the document store's 500-write batch limit
    pub const DEFAULT_BACKFILL_BATCH_SIZE: u32 = 400;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rep_range_bounds_are_contiguous() {
        let bounds = strength::REP_RANGE_BOUNDS;
        assert_eq!(bounds[0].1, 1);
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].2 + 1, pair[1].1);
        }
        assert_eq!(bounds[bounds.len() - 1].2, 20);
    }

    #[test]
    fn test_rpe_table_descends() {
        let table = rpe::RPE_PERCENTAGE_TABLE;
        assert_eq!(table[0], (10.0, 1.00));
        assert_eq!(table[table.len() - 1], (5.0, 0.82));
        for pair in table.windows(2) {
            assert!(pair[0].0 > pair[1].0);
            assert!(pair[0].1 > pair[1].1);
        }
    }
}
