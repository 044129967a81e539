// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Memoizing exercise-metadata and bodyweight lookups.
//!
//! Both caches belong to a single run and are never invalidated while it
//! lasts. Missing records resolve to defaults instead of failing the run;
//! storage errors propagate.

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::config::AnalyticsConfig;
use crate::constants::exercises;
use crate::logging::AppLogger;
use crate::models::{ExerciseMetadata, ExerciseRecord, ExerciseType};
use crate::storage::AnalyticsStore;

/// Synchronous metadata access for the compute pass
pub trait MetadataLookup {
    /// Metadata for `exercise_id`, or the unknown placeholder
    fn metadata(&self, exercise_id: &str) -> &ExerciseMetadata;
}

/// Resolves exercise ids to [`ExerciseMetadata`]
pub struct MetadataResolver<'a> {
    cache: HashMap<String, ExerciseMetadata>,
    config: &'a AnalyticsConfig,
    fallback: ExerciseMetadata,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self {
            cache: HashMap::new(),
            config,
            fallback: ExerciseMetadata::unknown(),
        }
    }

    /// Resolve through the cache, querying the store on first sight
    pub async fn resolve(
        &mut self,
        store: &dyn AnalyticsStore,
        exercise_id: &str,
    ) -> Result<&ExerciseMetadata> {
        if !self.cache.contains_key(exercise_id) {
            let record = store
                .exercise_record(exercise_id)
                .await
                .with_context(|| format!("Failed to look up exercise {}", exercise_id))?;

            let metadata = match record {
                Some(record) => self.build_metadata(record),
                None => {
                    AppLogger::log_missing_reference("exercise", exercise_id);
                    self.fallback.clone()
                }
            };
            self.cache.insert(exercise_id.to_string(), metadata);
        }

        Ok(&self.cache[exercise_id])
    }

    /// Seed the cache directly, bypassing the store
    pub fn insert(&mut self, exercise_id: impl Into<String>, record: ExerciseRecord) {
        let metadata = self.build_metadata(record);
        self.cache.insert(exercise_id.into(), metadata);
    }

    /// Fill absent fields with "Unknown" and derive the compound-lift flag
    pub fn build_metadata(&self, record: ExerciseRecord) -> ExerciseMetadata {
        let or_unknown = |value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| exercises::UNKNOWN.to_string())
        };

        let name = or_unknown(record.name);
        let is_compound_lift = self.config.is_compound_lift(&name);

        ExerciseMetadata {
            is_compound_lift,
            muscle_group: or_unknown(record.muscle_group),
            exercise_type: ExerciseType::from(or_unknown(record.exercise_type)),
            movement_pattern: or_unknown(record.movement_pattern),
            equipment: or_unknown(record.equipment),
            name,
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl MetadataLookup for MetadataResolver<'_> {
    fn metadata(&self, exercise_id: &str) -> &ExerciseMetadata {
        self.cache.get(exercise_id).unwrap_or(&self.fallback)
    }
}

/// Resolves user ids to bodyweight
#[derive(Debug, Default)]
pub struct BodyweightResolver {
    cache: HashMap<String, f64>,
}

impl BodyweightResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache; unknown users weigh 0
    pub async fn resolve(&mut self, store: &dyn AnalyticsStore, user_id: &str) -> Result<f64> {
        if let Some(bodyweight) = self.cache.get(user_id) {
            return Ok(*bodyweight);
        }

        let bodyweight = match store
            .user_bodyweight(user_id)
            .await
            .with_context(|| format!("Failed to look up bodyweight for user {}", user_id))?
        {
            Some(bodyweight) => bodyweight,
            None => {
                AppLogger::log_missing_reference("user", user_id);
                0.0
            }
        };

        self.cache.insert(user_id.to_string(), bodyweight);
        Ok(bodyweight)
    }

    /// Cached bodyweight, 0 if the user was never resolved
    pub fn bodyweight(&self, user_id: &str) -> f64 {
        self.cache.get(user_id).copied().unwrap_or(0.0)
    }
}
