// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Set-Level Calculator
//!
//! Turns the normalized sets of one exercise entry into load, e1RM, volume,
//! intensity and personal-record contributions for a single workout.
//!
//! All strength estimates use the Epley formula,
//! `e1RM = load * (1 + reps / 30)`, applied to the *effective* load: for
//! bodyweight movements the user's bodyweight replaces or augments the
//! logged weight.

use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

use super::effective_reps;
use crate::config::analytics_config::EffortConfig;
use crate::constants::strength::{EPLEY_DIVISOR, INTENSITY_BUCKET_WIDTH};
use crate::models::{ExerciseMetadata, ExerciseType, NormalizedSet, PrRecord, RepRange};

/// Load actually moved in a set
pub fn effective_weight(weight: f64, metadata: &ExerciseMetadata, bodyweight: f64) -> f64 {
    match metadata.exercise_type {
        ExerciseType::Bodyweight => bodyweight,
        ExerciseType::BodyweightLoadable => bodyweight + weight,
        ExerciseType::Other(_) => weight,
    }
}

/// Epley one-rep-max estimate
pub fn estimate_e1rm(weight: f64, reps: i32) -> f64 {
    weight * (1.0 + f64::from(reps) / EPLEY_DIVISOR)
}

/// Percent of a reference e1RM, rounded. `None` when no reference exists yet.
pub fn intensity_percent(effective_weight: f64, reference_e1rm: f64) -> Option<i64> {
    if reference_e1rm > 0.0 {
        Some((effective_weight / reference_e1rm * 100.0).round() as i64)
    } else {
        None
    }
}

/// Histogram key: the percent floored to its bucket (`87` -> `"80"`)
pub fn intensity_bucket(percent: i64) -> String {
    (percent.div_euclid(INTENSITY_BUCKET_WIDTH) * INTENSITY_BUCKET_WIDTH).to_string()
}

/// Per-set figures that do not depend on other sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetOutcome {
    pub effective_weight: f64,
    pub reps: i32,
    pub e1rm: f64,
    pub volume: f64,
    pub intensity_percent: Option<i64>,
    pub rep_range: RepRange,
}

/// Evaluate one set. Sets with no reps or not completed contribute nothing.
pub fn evaluate_set(
    set: &NormalizedSet,
    metadata: &ExerciseMetadata,
    bodyweight: f64,
    prior_e1rm: f64,
) -> Option<SetOutcome> {
    if set.reps <= 0 || !set.completed {
        return None;
    }

    let load = effective_weight(set.weight, metadata, bodyweight);
    Some(SetOutcome {
        effective_weight: load,
        reps: set.reps,
        e1rm: estimate_e1rm(load, set.reps),
        volume: load * f64::from(set.reps),
        intensity_percent: intensity_percent(load, prior_e1rm),
        rep_range: RepRange::from_reps(set.reps),
    })
}

/// What one workout contributes to a user × exercise accumulator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutExerciseStats {
    /// Best e1RM within this workout
    pub e1rm: f64,
    pub volume: f64,
    pub sets: u32,
    pub reps: u32,
    pub effective_reps: f64,
    pub intensity_distribution: BTreeMap<String, u32>,
    pub intensity_sum: i64,
    pub intensity_count: u32,
    pub prs: BTreeMap<RepRange, PrRecord>,
}

impl WorkoutExerciseStats {
    /// Mean intensity percent of this workout, if any set had one
    pub fn average_intensity_percent(&self) -> Option<f64> {
        (self.intensity_count > 0)
            .then(|| self.intensity_sum as f64 / f64::from(self.intensity_count))
    }

    /// Whether no set counted
    pub fn is_empty(&self) -> bool {
        self.sets == 0
    }
}

/// Keep `candidate` for its rep range unless an equal or better record exists
pub fn record_pr(prs: &mut BTreeMap<RepRange, PrRecord>, range: RepRange, candidate: PrRecord) {
    match prs.get(&range) {
        Some(existing) if !existing.is_beaten_by(&candidate) => {}
        _ => {
            prs.insert(range, candidate);
        }
    }
}

/// Fold every set of one exercise entry in one workout.
///
/// `prior_e1rm` is the exercise's cumulative e1RM before this workout. It is
/// the reference for intensity percentages; effective reps are judged
/// against the larger of it and this workout's own best.
pub fn summarize_exercise(
    sets: &[NormalizedSet],
    metadata: &ExerciseMetadata,
    bodyweight: f64,
    prior_e1rm: f64,
    date: DateTime<FixedOffset>,
    effort: &EffortConfig,
) -> WorkoutExerciseStats {
    let outcomes: Vec<SetOutcome> = sets
        .iter()
        .filter_map(|set| evaluate_set(set, metadata, bodyweight, prior_e1rm))
        .collect();

    let mut stats = WorkoutExerciseStats::default();
    for outcome in &outcomes {
        stats.e1rm = stats.e1rm.max(outcome.e1rm);
        stats.volume += outcome.volume;
        stats.sets += 1;
        stats.reps += outcome.reps.unsigned_abs();

        if let Some(percent) = outcome.intensity_percent {
            *stats
                .intensity_distribution
                .entry(intensity_bucket(percent))
                .or_insert(0) += 1;
            stats.intensity_sum += percent;
            stats.intensity_count += 1;
        }

        record_pr(
            &mut stats.prs,
            outcome.rep_range,
            PrRecord {
                e1rm: outcome.e1rm,
                weight: outcome.effective_weight,
                reps: outcome.reps,
                date,
            },
        );
    }

    let reference_e1rm = prior_e1rm.max(stats.e1rm);
    stats.effective_reps = outcomes
        .iter()
        .map(|o| effective_reps::effective_reps(o.effective_weight, o.reps, reference_e1rm, effort))
        .sum();

    stats
}
