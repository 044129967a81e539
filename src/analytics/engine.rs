// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Analytics Engine
//!
//! Drives one aggregation run in three passes:
//!
//! 1. **Read**: fetch every finished log, validate it, group it by user and
//!    warm the metadata and bodyweight caches.
//! 2. **Compute**: fold each user's history into exercise and monthly
//!    accumulators. Pure and synchronous.
//! 3. **Write**: hand one batch per user to the store. A failed batch is
//!    logged and the run moves on to the next user.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::history::{group_by_user, UserHistory};
use super::resolver::{BodyweightResolver, MetadataLookup, MetadataResolver};
use super::set_calculator::summarize_exercise;
use super::{balance, plateau, staleness};
use crate::config::AnalyticsConfig;
use crate::logging::AppLogger;
use crate::models::{
    ExerciseAnalytics, MonthlyAnalytics, MuscleBalance, UserAnalyticsBatch, WorkoutLog,
};
use crate::storage::AnalyticsStore;

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub users: usize,
    pub logs_processed: usize,
    /// Logs rejected for a missing required field
    pub logs_skipped: usize,
    /// Malformed entries dropped from otherwise valid logs
    pub entries_skipped: usize,
    /// Exercise records computed, or written once the write pass has run
    pub exercise_records: usize,
    /// Monthly records computed, or written once the write pass has run
    pub monthly_records: usize,
    /// Users whose batch write failed
    pub failed_users: Vec<String>,
}

/// Batches ready to be written, with the summary of how they were produced
#[derive(Debug, Clone)]
pub struct ComputedRun {
    pub batches: Vec<UserAnalyticsBatch>,
    pub summary: RunSummary,
}

pub struct AnalyticsEngine<'a> {
    store: &'a dyn AnalyticsStore,
    config: &'a AnalyticsConfig,
}

impl<'a> AnalyticsEngine<'a> {
    pub fn new(store: &'a dyn AnalyticsStore, config: &'a AnalyticsConfig) -> Self {
        Self { store, config }
    }

    /// Read and compute without writing anything
    pub async fn compute(&self) -> Result<ComputedRun> {
        let run_id = Uuid::new_v4().to_string();

        let raw_logs = self
            .store
            .finished_workout_logs()
            .await
            .context("Failed to read finished workout logs")?;

        let mut summary = RunSummary {
            run_id: run_id.clone(),
            ..RunSummary::default()
        };

        let mut logs: Vec<WorkoutLog> = Vec::with_capacity(raw_logs.len());
        for raw in raw_logs.into_iter().filter(|raw| raw.is_finished) {
            let log_id = raw.id.clone();
            match WorkoutLog::from_raw(raw) {
                Ok(log) => {
                    summary.entries_skipped += log.skipped_entries;
                    logs.push(log);
                }
                Err(e) => {
                    AppLogger::log_skipped_log(&log_id, &e.to_string());
                    summary.logs_skipped += 1;
                }
            }
        }
        summary.logs_processed = logs.len();

        let histories = group_by_user(logs);
        summary.users = histories.len();
        AppLogger::log_run_started(&run_id, summary.logs_processed, summary.users);

        let mut metadata = MetadataResolver::new(self.config);
        let mut bodyweights = BodyweightResolver::new();
        for history in histories.values() {
            bodyweights.resolve(self.store, history.user_id()).await?;
            for log in history.logs() {
                for entry in &log.exercises {
                    metadata.resolve(self.store, &entry.exercise_id).await?;
                }
            }
        }
        debug!(
            run.id = %run_id,
            exercises.resolved = metadata.cached_len(),
            "Reference data resolved"
        );

        let batches: Vec<UserAnalyticsBatch> = histories
            .values()
            .map(|history| {
                aggregate_user(
                    history,
                    &metadata,
                    bodyweights.bodyweight(history.user_id()),
                    self.config,
                )
            })
            .collect();

        summary.exercise_records = batches.iter().map(|b| b.exercises.len()).sum();
        summary.monthly_records = batches.iter().map(|b| b.months.len()).sum();

        Ok(ComputedRun { batches, summary })
    }

    /// Full run: compute, then write one batch per user
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let ComputedRun {
            batches,
            mut summary,
        } = self.compute().await?;

        summary.exercise_records = 0;
        summary.monthly_records = 0;

        for batch in &batches {
            let write_started = Instant::now();
            let records = batch.exercises.len() + batch.months.len();

            match self.store.write_user_batch(batch).await {
                Ok(()) => {
                    AppLogger::log_batch_write(
                        &batch.user_id,
                        records,
                        true,
                        write_started.elapsed().as_millis() as u64,
                    );
                    summary.exercise_records += batch.exercises.len();
                    summary.monthly_records += batch.months.len();
                }
                Err(e) => {
                    AppLogger::log_batch_write(
                        &batch.user_id,
                        records,
                        false,
                        write_started.elapsed().as_millis() as u64,
                    );
                    tracing::error!(user.id = %batch.user_id, error = %e, "Skipping user batch");
                    summary.failed_users.push(batch.user_id.clone());
                }
            }
        }

        AppLogger::log_run_completed(
            &summary.run_id,
            summary.exercise_records,
            summary.monthly_records,
            summary.failed_users.len(),
            started.elapsed().as_millis() as u64,
        );
        info!(store = self.store.store_name(), "Analytics run finished");

        Ok(summary)
    }
}

/// Fold one user's history into exercise and monthly records.
///
/// The history is newest first and the detectors see its recent window in
/// that order. The fold itself walks the logs oldest first, so each
/// workout's prior e1RM comes from earlier workouts and the staleness and
/// plateau verdicts that survive are those of the latest workout.
pub fn aggregate_user(
    history: &UserHistory,
    lookup: &impl MetadataLookup,
    bodyweight: f64,
    config: &AnalyticsConfig,
) -> UserAnalyticsBatch {
    let user_id = history.user_id();
    let window = history.recent_window(config.history.window);

    let mut exercises: BTreeMap<String, ExerciseAnalytics> = BTreeMap::new();
    let mut months: BTreeMap<String, MonthlyAnalytics> = BTreeMap::new();

    for log in history.logs().iter().rev() {
        let month_key = log.month_key();
        let mut month_delta = MonthlyAnalytics::new(user_id, &month_key);
        let mut counted = false;

        for entry in &log.exercises {
            let exercise_id = entry.exercise_id.as_str();
            let metadata = lookup.metadata(exercise_id);
            let prior_e1rm = exercises.get(exercise_id).map_or(0.0, |a| a.e1rm);

            let stats = summarize_exercise(
                &entry.normalized_sets(),
                metadata,
                bodyweight,
                prior_e1rm,
                log.completed_date,
                &config.effort,
            );
            if stats.is_empty() {
                continue;
            }
            counted = true;

            let staleness_score = staleness::score(
                exercise_id,
                metadata,
                window,
                log.completed_date,
                lookup,
                &config.staleness,
            )
            .unwrap_or_else(|e| {
                AppLogger::log_computation_fallback("staleness", user_id, exercise_id, &e.to_string());
                0
            });
            let plateau_data =
                plateau::detect(user_id, exercise_id, metadata, bodyweight, window, &config.history);

            let delta = ExerciseAnalytics::from_workout(
                user_id,
                exercise_id,
                metadata.clone(),
                &stats,
                staleness_score,
                plateau_data,
            );
            match exercises.entry(exercise_id.to_string()) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(delta),
                Entry::Vacant(slot) => {
                    slot.insert(delta);
                }
            }

            month_delta.total_volume += stats.volume;
            month_delta.total_effective_reps += stats.effective_reps;
            *month_delta
                .muscle_group_volume
                .entry(metadata.muscle_group.clone())
                .or_insert(0.0) += stats.volume;
            if metadata.is_compound_lift {
                *month_delta
                    .compound_lift_volume
                    .entry(metadata.name.clone())
                    .or_insert(0.0) += stats.volume;
            }
        }

        if !counted {
            continue;
        }

        month_delta.total_workouts = 1;
        month_delta.muscle_balance = balance::compute(exercises.values(), &config.muscle_groups)
            .unwrap_or_else(|e| {
                AppLogger::log_computation_fallback("balance", user_id, &log.id, &e.to_string());
                MuscleBalance::default()
            });

        months
            .entry(month_key.clone())
            .or_insert_with(|| MonthlyAnalytics::new(user_id, &month_key))
            .merge(month_delta);
    }

    UserAnalyticsBatch {
        user_id: user_id.to_string(),
        exercises: exercises.into_values().collect(),
        months: months.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExerciseEntry, ExerciseMetadata, ExerciseType, LoggedSet, PlateauTrend, RepRange, SetData,
    };
    use chrono::DateTime;
    use std::collections::HashMap;

    struct Lookup(HashMap<String, ExerciseMetadata>, ExerciseMetadata);

    impl MetadataLookup for Lookup {
        fn metadata(&self, exercise_id: &str) -> &ExerciseMetadata {
            self.0.get(exercise_id).unwrap_or(&self.1)
        }
    }

    fn lookup() -> Lookup {
        let mut map = HashMap::new();
        map.insert(
            "bench".to_string(),
            ExerciseMetadata {
                name: "Bench Press".to_string(),
                muscle_group: "Chest".to_string(),
                exercise_type: ExerciseType::Other("Barbell".to_string()),
                movement_pattern: "Horizontal Push".to_string(),
                equipment: "Barbell".to_string(),
                is_compound_lift: true,
            },
        );
        map.insert(
            "row".to_string(),
            ExerciseMetadata {
                name: "Cable Row".to_string(),
                muscle_group: "Back".to_string(),
                exercise_type: ExerciseType::Other("Cable".to_string()),
                movement_pattern: "Horizontal Pull".to_string(),
                equipment: "Cable".to_string(),
                is_compound_lift: false,
            },
        );
        Lookup(map, ExerciseMetadata::unknown())
    }

    fn log(id: &str, date: &str, entries: &[(&str, f64, f64)]) -> WorkoutLog {
        WorkoutLog {
            id: id.to_string(),
            user_id: "u1".to_string(),
            completed_date: DateTime::parse_from_rfc3339(date).unwrap(),
            exercises: entries
                .iter()
                .map(|(exercise_id, weight, reps)| ExerciseEntry {
                    exercise_id: exercise_id.to_string(),
                    data: SetData::SetsList(vec![LoggedSet {
                        weight: *weight,
                        reps: *reps,
                    }]),
                })
                .collect(),
            skipped_entries: 0,
        }
    }

    #[test]
    fn test_aggregate_user_builds_exercise_and_month_records() {
        let history = UserHistory::new(
            "u1",
            vec![
                log("a", "2024-01-10T10:00:00Z", &[("bench", 100.0, 5.0), ("row", 60.0, 10.0)]),
                log("b", "2024-02-03T10:00:00Z", &[("bench", 105.0, 5.0)]),
            ],
        );

        let batch = aggregate_user(&history, &lookup(), 80.0, &AnalyticsConfig::default());

        assert_eq!(batch.exercises.len(), 2);
        let bench = batch.exercises.iter().find(|e| e.exercise_id == "bench").unwrap();
        assert_eq!(bench.total_volume, 1025.0);
        assert_eq!(bench.total_reps, 10);
        assert!((bench.e1rm - 122.5).abs() < 1e-9);
        assert_eq!(bench.prs_by_rep_range[&RepRange::FiveRm].weight, 105.0);
        assert_eq!(bench.plateau_data.trend, PlateauTrend::InsufficientData);
        // Second workout saw the first one's e1RM as its reference
        assert_eq!(bench.intensity_distribution["90"], 1);

        let months: Vec<&str> = batch.months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        let january = &batch.months[0];
        assert_eq!(january.total_workouts, 1);
        assert_eq!(january.total_volume, 1100.0);
        assert_eq!(january.compound_lift_volume["Bench Press"], 500.0);
        assert!(!january.compound_lift_volume.contains_key("Cable Row"));
        assert_eq!(january.muscle_group_volume["Back"], 600.0);
        assert!(january.muscle_balance.push_pull_ratio.is_some());
    }

    #[test]
    fn test_sets_without_reps_leave_no_trace() {
        let history = UserHistory::new(
            "u1",
            vec![log("a", "2024-01-10T10:00:00Z", &[("bench", 100.0, 0.0)])],
        );

        let batch = aggregate_user(&history, &lookup(), 80.0, &AnalyticsConfig::default());
        assert!(batch.exercises.is_empty());
        assert!(batch.months.is_empty());
    }

    #[test]
    fn test_e1rm_never_decreases() {
        let history = UserHistory::new(
            "u1",
            vec![
                log("a", "2024-01-01T10:00:00Z", &[("bench", 120.0, 3.0)]),
                log("b", "2024-01-08T10:00:00Z", &[("bench", 80.0, 5.0)]),
            ],
        );

        let batch = aggregate_user(&history, &lookup(), 0.0, &AnalyticsConfig::default());
        assert!((batch.exercises[0].e1rm - 132.0).abs() < 1e-9);
    }
}
