// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Muscle balance ratios from a user's in-progress exercise analytics

use std::collections::BTreeMap;

use super::AnalysisError;
use crate::config::analytics_config::MuscleGroupConfig;
use crate::models::{ExerciseAnalytics, MuscleBalance};

/// Average e1RM per muscle group, then push/pull and quad/hamstring ratios.
/// Groups with no analytics are omitted from every sum.
pub fn compute<'a>(
    analytics: impl IntoIterator<Item = &'a ExerciseAnalytics>,
    groups: &MuscleGroupConfig,
) -> Result<MuscleBalance, AnalysisError> {
    let mut totals: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for record in analytics {
        if !record.e1rm.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "non-finite e1RM for exercise {}",
                record.exercise_id
            )));
        }
        let entry = totals
            .entry(record.metadata.muscle_group.clone())
            .or_insert((0.0, 0));
        entry.0 += record.e1rm;
        entry.1 += 1;
    }

    let muscle_group_strength: BTreeMap<String, f64> = totals
        .into_iter()
        .map(|(group, (sum, count))| (group, sum / f64::from(count)))
        .collect();

    let sum_of = |names: &[String]| -> f64 {
        names
            .iter()
            .filter_map(|name| muscle_group_strength.get(name))
            .sum()
    };
    let push_strength = sum_of(&groups.push);
    let pull_strength = sum_of(&groups.pull);

    let push_pull_ratio = (pull_strength > 0.0).then(|| push_strength / pull_strength);

    let quad_hamstring_ratio = match (
        muscle_group_strength.get(&groups.quadriceps),
        muscle_group_strength.get(&groups.hamstrings),
    ) {
        (Some(quads), Some(hamstrings)) if *hamstrings > 0.0 => Some(quads / hamstrings),
        _ => None,
    };

    Ok(MuscleBalance {
        muscle_group_strength,
        push_strength,
        pull_strength,
        push_pull_ratio,
        quad_hamstring_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseMetadata, PlateauData};

    fn analytics(exercise_id: &str, group: &str, e1rm: f64) -> ExerciseAnalytics {
        ExerciseAnalytics {
            user_id: "u1".to_string(),
            exercise_id: exercise_id.to_string(),
            metadata: ExerciseMetadata {
                muscle_group: group.to_string(),
                ..ExerciseMetadata::unknown()
            },
            e1rm,
            total_volume: 0.0,
            total_sets: 0,
            total_reps: 0,
            total_effective_reps: 0.0,
            average_intensity: 0.0,
            average_intensity_percent: 0.0,
            intensity_distribution: BTreeMap::new(),
            prs_by_rep_range: BTreeMap::new(),
            staleness_score: 0,
            plateau_data: PlateauData::default(),
        }
    }

    #[test]
    fn test_groups_are_averaged_before_summing() {
        let records = vec![
            analytics("bench", "Chest", 120.0),
            analytics("incline", "Chest", 100.0),
            analytics("ohp", "Shoulders", 70.0),
            analytics("row", "Back", 120.0),
            analytics("curl", "Biceps", 40.0),
        ];

        let balance = compute(&records, &MuscleGroupConfig::default()).unwrap();

        assert_eq!(balance.muscle_group_strength["Chest"], 110.0);
        assert_eq!(balance.push_strength, 180.0);
        assert_eq!(balance.pull_strength, 160.0);
        assert_eq!(balance.push_pull_ratio, Some(180.0 / 160.0));
        assert_eq!(balance.quad_hamstring_ratio, None);
    }

    #[test]
    fn test_no_pull_means_no_ratio() {
        let records = vec![analytics("bench", "Chest", 120.0)];
        let balance = compute(&records, &MuscleGroupConfig::default()).unwrap();

        assert_eq!(balance.pull_strength, 0.0);
        assert_eq!(balance.push_pull_ratio, None);
    }

    #[test]
    fn test_quad_hamstring_ratio_needs_both_groups() {
        let only_quads = vec![analytics("squat", "Quadriceps", 150.0)];
        let balance = compute(&only_quads, &MuscleGroupConfig::default()).unwrap();
        assert_eq!(balance.quad_hamstring_ratio, None);

        let both = vec![
            analytics("squat", "Quadriceps", 150.0),
            analytics("rdl", "Hamstrings", 100.0),
        ];
        let balance = compute(&both, &MuscleGroupConfig::default()).unwrap();
        assert_eq!(balance.quad_hamstring_ratio, Some(1.5));
    }

    #[test]
    fn test_non_finite_e1rm_is_rejected() {
        let records = vec![analytics("bench", "Chest", f64::NAN)];
        assert!(compute(&records, &MuscleGroupConfig::default()).is_err());
    }
}
