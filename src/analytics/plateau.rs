// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Plateau detection over the per-workout best e1RM series

use chrono::{DateTime, FixedOffset};

use super::history::HistoryWindow;
use super::set_calculator::{effective_weight, estimate_e1rm};
use super::AnalysisError;
use crate::config::analytics_config::HistoryConfig;
use crate::logging::AppLogger;
use crate::models::{ExerciseMetadata, PlateauData, PlateauTrend};

/// One workout's best e1RM for an exercise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct E1rmPoint {
    pub date: DateTime<FixedOffset>,
    pub value: f64,
}

/// Chronological best-e1RM series for `exercise_id`. Workouts where the
/// exercise produced no positive estimate are left out.
pub fn e1rm_series(
    exercise_id: &str,
    metadata: &ExerciseMetadata,
    bodyweight: f64,
    window: HistoryWindow<'_>,
) -> Vec<E1rmPoint> {
    window
        .oldest_first()
        .filter_map(|log| {
            let best = log
                .exercises
                .iter()
                .filter(|entry| entry.exercise_id == exercise_id)
                .flat_map(|entry| entry.normalized_sets())
                .filter(|set| set.completed && set.reps > 0)
                .map(|set| estimate_e1rm(effective_weight(set.weight, metadata, bodyweight), set.reps))
                .fold(0.0_f64, f64::max);

            (best > 0.0).then_some(E1rmPoint {
                date: log.completed_date,
                value: best,
            })
        })
        .collect()
}

/// Classify the last `plateau_points` points of a series
pub fn classify(points: &[E1rmPoint], config: &HistoryConfig) -> Result<PlateauData, AnalysisError> {
    let needed = config.plateau_points;
    if needed < 2 || points.len() < needed {
        return Ok(PlateauData::insufficient_data());
    }

    let recent = &points[points.len() - needed..];
    if recent.iter().any(|p| !p.value.is_finite()) {
        return Err(AnalysisError::InvalidData("non-finite e1RM in series".to_string()));
    }

    let max = recent.iter().map(|p| p.value).fold(f64::MIN, f64::max);
    let is_plateaued = recent
        .iter()
        .all(|p| (max - p.value) / max <= config.plateau_tolerance);

    let half = needed / 2;
    let first_avg = recent[..half].iter().map(|p| p.value).sum::<f64>() / half as f64;
    let second_avg =
        recent[half..].iter().map(|p| p.value).sum::<f64>() / (needed - half) as f64;

    if first_avg <= 0.0 {
        return Err(AnalysisError::ComputationError(format!(
            "cannot compare against a first-half average of {}",
            first_avg
        )));
    }

    let percent_change = (second_avg - first_avg) / first_avg * 100.0;
    if !percent_change.is_finite() {
        return Err(AnalysisError::ComputationError(
            "percent change is not finite".to_string(),
        ));
    }

    let trend = if percent_change > config.trend_threshold_percent {
        PlateauTrend::Improving
    } else if percent_change < -config.trend_threshold_percent {
        PlateauTrend::Declining
    } else {
        PlateauTrend::Stable
    };

    let plateau_days = if is_plateaued {
        let first = recent[0].date.naive_local();
        let last = recent[recent.len() - 1].date.naive_local();
        (last - first).num_days()
    } else {
        0
    };

    Ok(PlateauData {
        is_plateaued,
        plateau_days,
        trend,
        percent_change,
    })
}

/// Series extraction and classification in one step
pub fn try_detect(
    exercise_id: &str,
    metadata: &ExerciseMetadata,
    bodyweight: f64,
    window: HistoryWindow<'_>,
    config: &HistoryConfig,
) -> Result<PlateauData, AnalysisError> {
    let series = e1rm_series(exercise_id, metadata, bodyweight, window);
    classify(&series, config)
}

/// Like [`try_detect`], degrading to the `error` verdict on failure
pub fn detect(
    user_id: &str,
    exercise_id: &str,
    metadata: &ExerciseMetadata,
    bodyweight: f64,
    window: HistoryWindow<'_>,
    config: &HistoryConfig,
) -> PlateauData {
    match try_detect(exercise_id, metadata, bodyweight, window, config) {
        Ok(data) => data,
        Err(e) => {
            AppLogger::log_computation_fallback("plateau", user_id, exercise_id, &e.to_string());
            PlateauData::error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::history::UserHistory;
    use crate::models::{ExerciseEntry, ExerciseType, LoggedSet, SetData, WorkoutLog};

    fn point(day: u32, value: f64) -> E1rmPoint {
        E1rmPoint {
            date: DateTime::parse_from_rfc3339(&format!("2024-05-{day:02}T10:00:00Z")).unwrap(),
            value,
        }
    }

    fn barbell() -> ExerciseMetadata {
        ExerciseMetadata {
            exercise_type: ExerciseType::Other("Barbell".to_string()),
            ..ExerciseMetadata::unknown()
        }
    }

    fn log(id: &str, day: u32, exercise_id: &str, weight: f64, reps: f64) -> WorkoutLog {
        WorkoutLog {
            id: id.to_string(),
            user_id: "u1".to_string(),
            completed_date: DateTime::parse_from_rfc3339(&format!("2024-05-{day:02}T10:00:00Z"))
                .unwrap(),
            exercises: vec![ExerciseEntry {
                exercise_id: exercise_id.to_string(),
                data: SetData::SetsList(vec![LoggedSet { weight, reps }]),
            }],
            skipped_entries: 0,
        }
    }

    #[test]
    fn test_fewer_than_four_points_is_insufficient() {
        let data = classify(&[point(1, 100.0), point(3, 100.0), point(5, 100.0)], &HistoryConfig::default())
            .unwrap();

        assert!(!data.is_plateaued);
        assert_eq!(data.plateau_days, 0);
        assert_eq!(data.trend, PlateauTrend::InsufficientData);
        assert_eq!(serde_json::to_value(data.trend).unwrap(), "insufficient_data");
    }

    #[test]
    fn test_flat_series_is_plateaued() {
        let points = [point(1, 100.0), point(4, 101.0), point(8, 100.5), point(12, 99.5)];
        let data = classify(&points, &HistoryConfig::default()).unwrap();

        assert!(data.is_plateaued);
        assert_eq!(data.plateau_days, 11);
        assert_eq!(data.trend, PlateauTrend::Stable);
    }

    #[test]
    fn test_rising_series_is_improving() {
        let points = [point(1, 100.0), point(4, 102.0), point(8, 106.0), point(12, 110.0)];
        let data = classify(&points, &HistoryConfig::default()).unwrap();

        assert!(!data.is_plateaued);
        assert_eq!(data.plateau_days, 0);
        assert_eq!(data.trend, PlateauTrend::Improving);
        assert!((data.percent_change - 7.0 / 101.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_falling_series_is_declining() {
        let points = [point(1, 120.0), point(4, 118.0), point(8, 110.0), point(12, 108.0)];
        let data = classify(&points, &HistoryConfig::default()).unwrap();
        assert_eq!(data.trend, PlateauTrend::Declining);
    }

    #[test]
    fn test_only_last_points_are_classified() {
        let points = [
            point(1, 50.0),
            point(2, 100.0),
            point(4, 100.0),
            point(8, 100.0),
            point(12, 100.0),
        ];
        let data = classify(&points, &HistoryConfig::default()).unwrap();
        assert!(data.is_plateaued);
        assert_eq!(data.plateau_days, 10);
    }

    #[test]
    fn test_non_finite_values_degrade_to_error() {
        let points = [point(1, 100.0), point(4, f64::INFINITY), point(8, 100.0), point(12, 100.0)];
        assert!(classify(&points, &HistoryConfig::default()).is_err());
    }

    #[test]
    fn test_series_is_chronological_and_skips_zero_sets() {
        let history = UserHistory::new(
            "u1",
            vec![
                log("a", 1, "bench", 100.0, 5.0),
                log("b", 3, "bench", 0.0, 5.0),
                log("c", 5, "squat", 140.0, 5.0),
                log("d", 7, "bench", 90.0, 0.0),
                log("e", 9, "bench", 105.0, 3.0),
            ],
        );

        let series = e1rm_series("bench", &barbell(), 0.0, history.recent_window(20));
        assert_eq!(series.len(), 2);
        assert!(series[0].date < series[1].date);
        assert!((series[1].value - 115.5).abs() < 1e-9);

        let data = detect("u1", "bench", &barbell(), 0.0, history.recent_window(20), &HistoryConfig::default());
        assert_eq!(data.trend, PlateauTrend::InsufficientData);
    }
}
