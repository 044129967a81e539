// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tunable heuristics for the aggregation engine

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{exercises, history, muscle_groups, rpe, staleness};

const CONFIG_FILE_NAME: &str = "analytics_config.toml";

/// Main analytics configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub history: HistoryConfig,
    pub staleness: StalenessConfig,
    pub effort: EffortConfig,
    pub muscle_groups: MuscleGroupConfig,
    /// Exercise names treated as compound lifts, compared case-insensitively
    pub compound_lifts: Vec<String>,
}

/// Recent-history window used by the staleness and plateau detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub window: usize,
    pub plateau_points: usize,
    pub plateau_tolerance: f64,
    pub trend_threshold_percent: f64,
}

/// Staleness day multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    pub variation_day_multiplier: i64,
    pub no_variation_day_multiplier: i64,
    pub max_score: i64,
}

/// One row of the RPE lookup table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpeEntry {
    pub rpe: f64,
    /// Fraction of e1RM associated with this RPE
    pub percentage: f64,
}

/// Effective-rep estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortConfig {
    /// Searched in order; the first of equally near entries wins
    pub rpe_table: Vec<RpeEntry>,
    pub default_rpe: f64,
    pub effective_rpe_threshold: f64,
    pub rep_correction_per_rep: f64,
    pub rep_correction_pivot: i32,
    pub multiplier_cap: f64,
}

/// Muscle group names used for balance ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuscleGroupConfig {
    pub push: Vec<String>,
    pub pull: Vec<String>,
    pub quadriceps: String,
    pub hamstrings: String,
}

impl AnalyticsConfig {
    /// Load analytics configuration from file or use defaults.
    ///
    /// Lookup order: explicit path, `analytics_config.toml` in the working
    /// directory, `<config dir>/strength-analytics/analytics_config.toml`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        if Path::new(CONFIG_FILE_NAME).exists() {
            return Self::load_from_file(CONFIG_FILE_NAME);
        }

        if let Some(user_path) = Self::user_config_path().filter(|p| p.exists()) {
            return Self::load_from_file(&user_path.to_string_lossy());
        }

        debug!("No analytics config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analytics config file: {}", path))?;

        let config: AnalyticsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse analytics config file: {}", path))?;

        config.validate()?;
        info!(config.path = %path, "Loaded analytics configuration");
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strength-analytics").join(CONFIG_FILE_NAME))
    }

    /// Reject configurations the detectors cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.history.plateau_points < 2 || self.history.plateau_points % 2 != 0 {
            return Err(anyhow::anyhow!(
                "history.plateau_points must be an even number of at least 2"
            ));
        }
        if self.history.window < self.history.plateau_points {
            return Err(anyhow::anyhow!(
                "history.window must be at least history.plateau_points"
            ));
        }
        if !(0..=100).contains(&self.staleness.max_score) {
            return Err(anyhow::anyhow!("staleness.max_score must be within 0..=100"));
        }
        if self.effort.rpe_table.is_empty() {
            return Err(anyhow::anyhow!("effort.rpe_table cannot be empty"));
        }
        Ok(())
    }

    /// Case-insensitive membership test against the compound-lift names
    pub fn is_compound_lift(&self, exercise_name: &str) -> bool {
        self.compound_lifts
            .iter()
            .any(|name| name.eq_ignore_ascii_case(exercise_name))
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            staleness: StalenessConfig::default(),
            effort: EffortConfig::default(),
            muscle_groups: MuscleGroupConfig::default(),
            compound_lifts: exercises::COMPOUND_LIFTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: history::HISTORY_WINDOW,
            plateau_points: history::PLATEAU_POINTS,
            plateau_tolerance: history::PLATEAU_TOLERANCE,
            trend_threshold_percent: history::TREND_THRESHOLD_PERCENT,
        }
    }
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            variation_day_multiplier: staleness::VARIATION_DAY_MULTIPLIER,
            no_variation_day_multiplier: staleness::NO_VARIATION_DAY_MULTIPLIER,
            max_score: staleness::MAX_SCORE,
        }
    }
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            rpe_table: rpe::RPE_PERCENTAGE_TABLE
                .iter()
                .map(|&(rpe, percentage)| RpeEntry { rpe, percentage })
                .collect(),
            default_rpe: rpe::DEFAULT_RPE,
            effective_rpe_threshold: rpe::EFFECTIVE_RPE_THRESHOLD,
            rep_correction_per_rep: rpe::REP_CORRECTION_PER_REP,
            rep_correction_pivot: rpe::REP_CORRECTION_PIVOT,
            multiplier_cap: rpe::EFFECTIVE_MULTIPLIER_CAP,
        }
    }
}

impl Default for MuscleGroupConfig {
    fn default() -> Self {
        Self {
            push: muscle_groups::PUSH_GROUPS.iter().map(|s| s.to_string()).collect(),
            pull: muscle_groups::PULL_GROUPS.iter().map(|s| s.to_string()).collect(),
            quadriceps: muscle_groups::QUADRICEPS.to_string(),
            hamstrings: muscle_groups::HAMSTRINGS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_analytics_config() {
        let config = AnalyticsConfig::default();

        assert_eq!(config.history.window, 20);
        assert_eq!(config.history.plateau_points, 4);
        assert_eq!(config.history.plateau_tolerance, 0.02);
        assert_eq!(config.staleness.variation_day_multiplier, 2);
        assert_eq!(config.staleness.no_variation_day_multiplier, 3);
        assert_eq!(config.effort.rpe_table.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compound_lift_membership_ignores_case() {
        let config = AnalyticsConfig::default();

        assert!(config.is_compound_lift("deadlift"));
        assert!(config.is_compound_lift("BENCH PRESS"));
        assert!(!config.is_compound_lift("Bicep Curl"));
    }

    #[test]
    fn test_config_file_loading() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, r#"
compound_lifts = ["Squat", "Clean"]

[history]
window = 12
plateau_points = 6

[staleness]
max_score = 90

[muscle_groups]
quadriceps = "Quads"
        "#)?;

        let config = AnalyticsConfig::load_from_file(temp_file.path().to_str().unwrap())?;

        assert_eq!(config.history.window, 12);
        assert_eq!(config.history.plateau_points, 6);
        // Unspecified fields keep their defaults
        assert_eq!(config.history.plateau_tolerance, 0.02);
        assert_eq!(config.staleness.max_score, 90);
        assert_eq!(config.staleness.variation_day_multiplier, 2);
        assert_eq!(config.muscle_groups.quadriceps, "Quads");
        assert_eq!(config.muscle_groups.hamstrings, "Hamstrings");
        assert!(config.is_compound_lift("clean"));
        assert!(!config.is_compound_lift("Deadlift"));

        Ok(())
    }

    #[test]
    fn test_invalid_window_is_rejected() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[history]\nwindow = 3\nplateau_points = 4")?;

        let result = AnalyticsConfig::load_from_file(temp_file.path().to_str().unwrap());
        assert!(result.is_err());

        Ok(())
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        assert!(AnalyticsConfig::load(Some("/definitely/not/here.toml")).is_err());
    }
}
