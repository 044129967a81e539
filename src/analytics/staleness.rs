// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Exercise staleness: how long an exercise has been trained without a
//! variation of its movement pattern.

use chrono::{DateTime, FixedOffset};

use super::history::HistoryWindow;
use super::resolver::MetadataLookup;
use super::AnalysisError;
use crate::config::analytics_config::StalenessConfig;
use crate::models::ExerciseMetadata;

/// Score staleness of `exercise_id` as of `target_date`.
///
/// Walks the window newest first. Every log containing the exercise moves
/// the day count back to that log, even when the same workout also holds a
/// variation. The walk stops at the first log without the exercise that
/// holds a different exercise with the same movement pattern.
///
/// Exercises whose pattern resolved to "Unknown" are never treated as
/// sharing a pattern, so two unresolved exercises are not variations of
/// each other.
pub fn score(
    exercise_id: &str,
    metadata: &ExerciseMetadata,
    window: HistoryWindow<'_>,
    target_date: DateTime<FixedOffset>,
    lookup: &impl MetadataLookup,
    config: &StalenessConfig,
) -> Result<u8, AnalysisError> {
    let target = target_date.naive_local();
    let mut days_since_variation: i64 = 0;
    let mut variation_found = false;

    for log in window.newest_first() {
        if log.contains_exercise(exercise_id) {
            days_since_variation = (target - log.local_date()).num_days();
            continue;
        }

        if metadata.has_known_pattern()
            && log.exercises.iter().any(|entry| {
                lookup.metadata(&entry.exercise_id).movement_pattern == metadata.movement_pattern
            })
        {
            variation_found = true;
            break;
        }
    }

    let multiplier = if variation_found {
        config.variation_day_multiplier
    } else {
        config.no_variation_day_multiplier
    };

    let raw = days_since_variation.checked_mul(multiplier).ok_or_else(|| {
        AnalysisError::ComputationError(format!(
            "staleness overflow for {} days x {}",
            days_since_variation, multiplier
        ))
    })?;

    // Logs newer than the target give negative spans
    let clamped = raw.clamp(0, config.max_score);
    u8::try_from(clamped)
        .map_err(|_| AnalysisError::InvalidData(format!("staleness score {} out of range", clamped)))
}
