// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures shared by the storage layer and the aggregation engine.
//!
//! ## Design Principles
//!
//! - **Shape Agnostic**: both the current `sets` list and the legacy parallel-array
//!   entry shape normalize into one [`NormalizedSet`] sequence
//! - **Validated at the Edge**: [`RawWorkoutLog`] is what storage hands over;
//!   [`WorkoutLog`] only exists once the required fields are present
//! - **Deterministic Output**: analytics maps are `BTreeMap`s so identical input
//!   serializes identically
//!
//! ## Core Models
//!
//! - [`WorkoutLog`]: a finished workout with its exercise entries
//! - [`ExerciseEntry`]: one exercise performed within a workout
//! - [`ExerciseMetadata`]: resolved semantic attributes of an exercise
//! - [`ExerciseAnalytics`]: per user × exercise accumulator
//! - [`MonthlyAnalytics`]: per user × calendar month accumulator

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::constants::{exercises, strength};

/// Errors raised while validating raw workout documents
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Workout log {log_id} is missing required field `{field}`")]
    MissingRequiredField { log_id: String, field: &'static str },

    #[error("Malformed exercise entry: {0}")]
    MalformedEntry(String),
}

/// A workout document exactly as the storage collaborator returns it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkoutLog {
    /// Stable document identifier
    pub id: String,
    pub user_id: Option<String>,
    /// Exercise entries, kept untyped so one bad entry cannot reject the document
    pub exercises: Option<Vec<Value>>,
    pub completed_date: Option<DateTime<FixedOffset>>,
    /// Legacy date field, used when `completedDate` is absent
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub is_finished: bool,
}

/// A validated, immutable workout log
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutLog {
    pub id: String,
    pub user_id: String,
    /// Effective date: `completedDate`, falling back to the legacy `date`
    pub completed_date: DateTime<FixedOffset>,
    pub exercises: Vec<ExerciseEntry>,
    /// Entries dropped during validation because their shape was not recognized
    pub skipped_entries: usize,
}

impl WorkoutLog {
    /// Validate a raw document.
    ///
    /// A missing user, exercise list or date rejects the whole log. Malformed
    /// exercise entries are dropped individually and counted in `skipped_entries`.
    pub fn from_raw(raw: RawWorkoutLog) -> Result<Self, IngestError> {
        let missing = |field| IngestError::MissingRequiredField {
            log_id: raw.id.clone(),
            field,
        };

        let user_id = raw
            .user_id
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| missing("userId"))?;
        let completed_date = raw
            .completed_date
            .or(raw.date)
            .ok_or_else(|| missing("completedDate"))?;
        let raw_entries = raw
            .exercises
            .as_ref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| missing("exercises"))?;

        let mut exercises = Vec::with_capacity(raw_entries.len());
        let mut skipped_entries = 0;
        for (index, value) in raw_entries.iter().enumerate() {
            match ExerciseEntry::from_value(value) {
                Ok(entry) => exercises.push(entry),
                Err(e) => {
                    warn!(log.id = %raw.id, entry.index = index, error = %e, "Skipping exercise entry");
                    skipped_entries += 1;
                }
            }
        }

        Ok(Self {
            id: raw.id,
            user_id,
            completed_date,
            exercises,
            skipped_entries,
        })
    }

    /// Wall-clock date with the offset stripped
    pub fn local_date(&self) -> NaiveDateTime {
        self.completed_date.naive_local()
    }

    /// Calendar month key, `YYYY-MM`
    pub fn month_key(&self) -> String {
        let date = self.local_date();
        format!("{:04}-{:02}", date.year(), date.month())
    }

    /// Whether any entry in this log is the given exercise
    pub fn contains_exercise(&self, exercise_id: &str) -> bool {
        self.exercises.iter().any(|e| e.exercise_id == exercise_id)
    }
}

/// One logged set in the current entry shape
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoggedSet {
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub reps: f64,
}

/// The two historical shapes an exercise entry's set data can take
#[derive(Debug, Clone, PartialEq)]
pub enum SetData {
    /// Current shape: ordered list of `{weight, reps}`
    SetsList(Vec<LoggedSet>),
    /// Legacy shape: parallel `reps[]`, `weights[]`, `completed[]`
    ParallelArrays {
        reps: Vec<f64>,
        weights: Vec<f64>,
        completed: Vec<bool>,
    },
}

/// A set in canonical form, independent of the entry shape it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedSet {
    pub weight: f64,
    pub reps: i32,
    pub completed: bool,
}

/// One exercise performed within a workout
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseEntry {
    pub exercise_id: String,
    pub data: SetData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExerciseEntry {
    #[serde(alias = "id")]
    exercise_id: Option<String>,
    sets: Option<Vec<LoggedSet>>,
    reps: Option<Vec<f64>>,
    weights: Option<Vec<f64>>,
    completed: Option<Vec<Value>>,
}

impl ExerciseEntry {
    /// Recognize the entry shape of an untyped exercise document
    pub fn from_value(value: &Value) -> Result<Self, IngestError> {
        let raw: RawExerciseEntry = serde_json::from_value(value.clone())
            .map_err(|e| IngestError::MalformedEntry(e.to_string()))?;

        let exercise_id = raw
            .exercise_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IngestError::MalformedEntry("missing exerciseId".to_string()))?;

        let data = match (raw.sets, raw.reps, raw.weights, raw.completed) {
            (Some(sets), _, _, _) if !sets.is_empty() => SetData::SetsList(sets),
            (_, Some(reps), Some(weights), Some(completed)) if !reps.is_empty() => {
                SetData::ParallelArrays {
                    reps,
                    weights,
                    completed: completed.iter().map(is_truthy).collect(),
                }
            }
            _ => {
                return Err(IngestError::MalformedEntry(format!(
                    "exercise {exercise_id} has no recognizable set data"
                )))
            }
        };

        Ok(Self { exercise_id, data })
    }

    /// Canonical set sequence. Legacy indices without a truthy `completed`
    /// flag are excluded.
    pub fn normalized_sets(&self) -> Vec<NormalizedSet> {
        match &self.data {
            SetData::SetsList(sets) => sets
                .iter()
                .map(|s| NormalizedSet {
                    weight: s.weight,
                    reps: s.reps as i32,
                    completed: true,
                })
                .collect(),
            SetData::ParallelArrays {
                reps,
                weights,
                completed,
            } => reps
                .iter()
                .zip(weights.iter())
                .enumerate()
                .filter(|(i, _)| completed.get(*i).copied().unwrap_or(false))
                .map(|(_, (r, w))| NormalizedSet {
                    weight: *w,
                    reps: *r as i32,
                    completed: true,
                })
                .collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// How load is derived for an exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExerciseType {
    /// Load is the user's bodyweight; logged weight is ignored
    Bodyweight,
    /// Load is bodyweight plus logged weight
    BodyweightLoadable,
    /// Load is the logged weight
    Other(String),
}

impl ExerciseType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bodyweight => exercises::BODYWEIGHT,
            Self::BodyweightLoadable => exercises::BODYWEIGHT_LOADABLE,
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ExerciseType {
    fn from(value: String) -> Self {
        match value.as_str() {
            exercises::BODYWEIGHT => Self::Bodyweight,
            exercises::BODYWEIGHT_LOADABLE => Self::BodyweightLoadable,
            _ => Self::Other(value),
        }
    }
}

impl From<ExerciseType> for String {
    fn from(value: ExerciseType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source fields of the master exercise reference, any of which may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub name: Option<String>,
    pub muscle_group: Option<String>,
    pub exercise_type: Option<String>,
    pub movement_pattern: Option<String>,
    pub equipment: Option<String>,
}

/// Resolved semantic attributes of an exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseMetadata {
    pub name: String,
    pub muscle_group: String,
    pub exercise_type: ExerciseType,
    pub movement_pattern: String,
    pub equipment: String,
    pub is_compound_lift: bool,
}

impl ExerciseMetadata {
    /// Metadata used when an exercise id cannot be resolved
    pub fn unknown() -> Self {
        Self {
            name: exercises::UNKNOWN.to_string(),
            muscle_group: exercises::UNKNOWN.to_string(),
            exercise_type: ExerciseType::Other(exercises::UNKNOWN.to_string()),
            movement_pattern: exercises::UNKNOWN.to_string(),
            equipment: exercises::UNKNOWN.to_string(),
            is_compound_lift: false,
        }
    }

    /// Whether the movement pattern is a real value rather than the placeholder
    pub fn has_known_pattern(&self) -> bool {
        !self.movement_pattern.is_empty() && self.movement_pattern != exercises::UNKNOWN
    }
}

/// Rep-range classification used to bucket personal records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RepRange {
    #[serde(rename = "1RM")]
    OneRm,
    #[serde(rename = "3RM")]
    ThreeRm,
    #[serde(rename = "5RM")]
    FiveRm,
    #[serde(rename = "8RM")]
    EightRm,
    #[serde(rename = "12RM")]
    TwelveRm,
    #[serde(rename = "15RM")]
    FifteenRm,
}

impl RepRange {
    const ALL: [RepRange; 6] = [
        Self::OneRm,
        Self::ThreeRm,
        Self::FiveRm,
        Self::EightRm,
        Self::TwelveRm,
        Self::FifteenRm,
    ];

    /// Classify a rep count. Counts above the table default to `15RM`.
    pub fn from_reps(reps: i32) -> Self {
        Self::ALL
            .iter()
            .zip(strength::REP_RANGE_BOUNDS.iter())
            .find(|(_, (_, low, high))| (*low..=*high).contains(&reps))
            .map(|(range, _)| *range)
            .unwrap_or(Self::FifteenRm)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneRm => "1RM",
            Self::ThreeRm => "3RM",
            Self::FiveRm => "5RM",
            Self::EightRm => "8RM",
            Self::TwelveRm => "12RM",
            Self::FifteenRm => "15RM",
        }
    }
}

impl std::fmt::Display for RepRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for RepRange {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|r| r.label() == s)
            .copied()
            .ok_or_else(|| format!("Unknown rep range: {}", s))
    }
}

/// Best set seen for one rep-range label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRecord {
    #[serde(rename = "e1RM")]
    pub e1rm: f64,
    /// Effective weight of the set
    pub weight: f64,
    pub reps: i32,
    pub date: DateTime<FixedOffset>,
}

impl PrRecord {
    /// Whether `candidate` should replace this record. Ties keep the existing one.
    pub fn is_beaten_by(&self, candidate: &PrRecord) -> bool {
        candidate.e1rm > self.e1rm
    }

    /// e1RM rounded to a whole unit, as persisted
    pub fn rounded_e1rm(&self) -> f64 {
        self.e1rm.round()
    }
}

/// Direction reported by plateau detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauTrend {
    Improving,
    Declining,
    Stable,
    #[default]
    InsufficientData,
    Error,
}

impl std::fmt::Display for PlateauTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Stable => write!(f, "stable"),
            Self::InsufficientData => write!(f, "insufficient_data"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Plateau verdict for one exercise
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateauData {
    pub is_plateaued: bool,
    pub plateau_days: i64,
    pub trend: PlateauTrend,
    /// Raw percent difference between the late and early halves of the window
    pub percent_change: f64,
}

impl PlateauData {
    pub fn insufficient_data() -> Self {
        Self::default()
    }

    pub fn error() -> Self {
        Self {
            trend: PlateauTrend::Error,
            ..Self::default()
        }
    }
}

/// Cross-exercise strength balance for one user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuscleBalance {
    /// Average e1RM per muscle group
    pub muscle_group_strength: BTreeMap<String, f64>,
    pub push_strength: f64,
    pub pull_strength: f64,
    pub push_pull_ratio: Option<f64>,
    pub quad_hamstring_ratio: Option<f64>,
}

/// Accumulated analytics for one user × exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseAnalytics {
    pub user_id: String,
    pub exercise_id: String,
    #[serde(flatten)]
    pub metadata: ExerciseMetadata,
    #[serde(rename = "e1RM")]
    pub e1rm: f64,
    pub total_volume: f64,
    pub total_sets: u32,
    pub total_reps: u32,
    pub total_effective_reps: f64,
    /// `total_volume / total_reps`
    pub average_intensity: f64,
    /// Mean intensity percent of the most recent workout that produced one
    pub average_intensity_percent: f64,
    pub intensity_distribution: BTreeMap<String, u32>,
    pub prs_by_rep_range: BTreeMap<RepRange, PrRecord>,
    pub staleness_score: u8,
    pub plateau_data: PlateauData,
}

/// Accumulated analytics for one user × calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAnalytics {
    pub user_id: String,
    /// `YYYY-MM`
    pub month: String,
    pub total_volume: f64,
    pub total_workouts: u32,
    pub total_effective_reps: f64,
    pub muscle_group_volume: BTreeMap<String, f64>,
    /// Volume keyed by compound-lift exercise name
    pub compound_lift_volume: BTreeMap<String, f64>,
    pub muscle_balance: MuscleBalance,
}

impl MonthlyAnalytics {
    pub fn new(user_id: &str, month: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            month: month.to_string(),
            total_volume: 0.0,
            total_workouts: 0,
            total_effective_reps: 0.0,
            muscle_group_volume: BTreeMap::new(),
            compound_lift_volume: BTreeMap::new(),
            muscle_balance: MuscleBalance::default(),
        }
    }
}

/// Everything computed for one user, written as a single batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalyticsBatch {
    pub user_id: String,
    pub exercises: Vec<ExerciseAnalytics>,
    pub months: Vec<MonthlyAnalytics>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_current_shape_normalizes() {
        let entry = ExerciseEntry::from_value(&json!({
            "exerciseId": "bench",
            "sets": [{"weight": 100, "reps": 5}, {"weight": 105, "reps": 3}]
        }))
        .unwrap();

        let sets = entry.normalized_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].weight, 105.0);
        assert_eq!(sets[1].reps, 3);
    }

    #[test]
    fn test_legacy_shape_keeps_only_completed() {
        let entry = ExerciseEntry::from_value(&json!({
            "exerciseId": "squat",
            "reps": [5, 5, 5],
            "weights": [140, 150, 160],
            "completed": [true, 0, "yes"]
        }))
        .unwrap();

        let sets = entry.normalized_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].weight, 140.0);
        assert_eq!(sets[1].weight, 160.0);
    }

    #[test]
    fn test_legacy_shape_missing_completed_flags_do_not_count() {
        let entry = ExerciseEntry::from_value(&json!({
            "exerciseId": "squat",
            "reps": [5, 5, 5],
            "weights": [140, 150, 160],
            "completed": [true]
        }))
        .unwrap();

        assert_eq!(entry.normalized_sets().len(), 1);
    }

    #[test]
    fn test_unrecognized_shape_is_malformed() {
        let result = ExerciseEntry::from_value(&json!({ "exerciseId": "row", "sets": [] }));
        assert!(matches!(result, Err(IngestError::MalformedEntry(_))));

        let result = ExerciseEntry::from_value(&json!({ "sets": [{"weight": 1, "reps": 1}] }));
        assert!(matches!(result, Err(IngestError::MalformedEntry(_))));
    }

    #[test]
    fn test_log_falls_back_to_legacy_date() {
        let raw = RawWorkoutLog {
            id: "log1".to_string(),
            user_id: Some("u1".to_string()),
            exercises: Some(vec![json!({"exerciseId": "bench", "sets": [{"weight": 60, "reps": 8}]})]),
            completed_date: None,
            date: Some(date("2024-03-05T10:00:00Z")),
            is_finished: true,
        };

        let log = WorkoutLog::from_raw(raw).unwrap();
        assert_eq!(log.completed_date, date("2024-03-05T10:00:00Z"));
        assert_eq!(log.month_key(), "2024-03");
    }

    #[test]
    fn test_log_without_user_is_rejected() {
        let raw = RawWorkoutLog {
            id: "log2".to_string(),
            exercises: Some(vec![json!({"exerciseId": "bench", "sets": [{"weight": 60, "reps": 8}]})]),
            date: Some(date("2024-03-05T10:00:00Z")),
            ..Default::default()
        };

        match WorkoutLog::from_raw(raw) {
            Err(IngestError::MissingRequiredField { field, .. }) => assert_eq!(field, "userId"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_entry_does_not_reject_log() {
        let raw = RawWorkoutLog {
            id: "log3".to_string(),
            user_id: Some("u1".to_string()),
            exercises: Some(vec![
                json!({"exerciseId": "bench", "sets": [{"weight": 60, "reps": 8}]}),
                json!({"exerciseId": "mystery", "notes": "forgot to log"}),
            ]),
            completed_date: Some(date("2024-03-05T10:00:00+02:00")),
            ..Default::default()
        };

        let log = WorkoutLog::from_raw(raw).unwrap();
        assert_eq!(log.exercises.len(), 1);
        assert_eq!(log.skipped_entries, 1);
    }

    #[test]
    fn test_rep_range_classification() {
        assert_eq!(RepRange::from_reps(1), RepRange::OneRm);
        assert_eq!(RepRange::from_reps(3), RepRange::ThreeRm);
        assert_eq!(RepRange::from_reps(4), RepRange::FiveRm);
        assert_eq!(RepRange::from_reps(8), RepRange::EightRm);
        assert_eq!(RepRange::from_reps(12), RepRange::TwelveRm);
        assert_eq!(RepRange::from_reps(20), RepRange::FifteenRm);
        assert_eq!(RepRange::from_reps(35), RepRange::FifteenRm);
        assert_eq!("8RM".parse::<RepRange>().unwrap(), RepRange::EightRm);
    }

    #[test]
    fn test_exercise_type_round_trips_through_strings() {
        assert_eq!(ExerciseType::from("Bodyweight".to_string()), ExerciseType::Bodyweight);
        assert_eq!(
            ExerciseType::from("Bodyweight Loadable".to_string()),
            ExerciseType::BodyweightLoadable
        );
        let other = ExerciseType::from("Barbell".to_string());
        assert_eq!(String::from(other), "Barbell");
    }

    #[test]
    fn test_pr_map_serializes_with_labels() {
        let mut prs = BTreeMap::new();
        prs.insert(
            RepRange::FiveRm,
            PrRecord {
                e1rm: 116.67,
                weight: 100.0,
                reps: 5,
                date: date("2024-01-01T00:00:00Z"),
            },
        );
        let json = serde_json::to_value(&prs).unwrap();
        assert_eq!(json["5RM"]["e1RM"], 116.67);
    }
}
