// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Merge protocol for the exercise and monthly accumulators.
//!
//! Every workout produces a delta record of the same type as the
//! accumulator. Merging a delta sums cumulative fields, keeps the running
//! e1RM maximum, merges PRs per rep range and overwrites the fields that
//! describe the latest state (metadata, staleness, plateau, balance).

use std::collections::BTreeMap;

use super::set_calculator::{record_pr, WorkoutExerciseStats};
use crate::models::{
    ExerciseAnalytics, ExerciseMetadata, MonthlyAnalytics, PlateauData,
};

fn sum_into<V>(target: &mut BTreeMap<String, V>, source: BTreeMap<String, V>)
where
    V: std::ops::AddAssign + Default,
{
    for (key, value) in source {
        *target.entry(key).or_default() += value;
    }
}

fn average_intensity(total_volume: f64, total_reps: u32) -> f64 {
    if total_reps > 0 {
        total_volume / f64::from(total_reps)
    } else {
        0.0
    }
}

impl ExerciseAnalytics {
    /// Delta record for one workout's contribution
    pub fn from_workout(
        user_id: &str,
        exercise_id: &str,
        metadata: ExerciseMetadata,
        stats: &WorkoutExerciseStats,
        staleness_score: u8,
        plateau_data: PlateauData,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            exercise_id: exercise_id.to_string(),
            metadata,
            e1rm: stats.e1rm,
            total_volume: stats.volume,
            total_sets: stats.sets,
            total_reps: stats.reps,
            total_effective_reps: stats.effective_reps,
            average_intensity: average_intensity(stats.volume, stats.reps),
            average_intensity_percent: stats.average_intensity_percent().unwrap_or(0.0),
            intensity_distribution: stats.intensity_distribution.clone(),
            prs_by_rep_range: stats.prs.clone(),
            staleness_score,
            plateau_data,
        }
    }

    /// Fold a later delta into this accumulator
    pub fn merge(&mut self, other: ExerciseAnalytics) {
        self.metadata = other.metadata;
        self.e1rm = self.e1rm.max(other.e1rm);
        self.total_volume += other.total_volume;
        self.total_sets += other.total_sets;
        self.total_reps += other.total_reps;
        self.total_effective_reps += other.total_effective_reps;

        // Percent is "last computed": only a delta that had a reference e1RM replaces it
        if !other.intensity_distribution.is_empty() {
            self.average_intensity_percent = other.average_intensity_percent;
        }
        sum_into(&mut self.intensity_distribution, other.intensity_distribution);

        for (range, record) in other.prs_by_rep_range {
            record_pr(&mut self.prs_by_rep_range, range, record);
        }

        self.staleness_score = other.staleness_score;
        self.plateau_data = other.plateau_data;
        self.average_intensity = average_intensity(self.total_volume, self.total_reps);
    }
}

impl MonthlyAnalytics {
    /// Fold a later delta into this accumulator
    pub fn merge(&mut self, other: MonthlyAnalytics) {
        self.total_volume += other.total_volume;
        self.total_workouts += other.total_workouts;
        self.total_effective_reps += other.total_effective_reps;
        sum_into(&mut self.muscle_group_volume, other.muscle_group_volume);
        sum_into(&mut self.compound_lift_volume, other.compound_lift_volume);
        self.muscle_balance = other.muscle_balance;
    }
}
