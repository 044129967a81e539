// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-process store used by tests and dry runs

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::AnalyticsStore;
use crate::models::{ExerciseRecord, RawWorkoutLog, UserAnalyticsBatch};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    logs: RwLock<Vec<RawWorkoutLog>>,
    exercises: RwLock<HashMap<String, ExerciseRecord>>,
    bodyweights: RwLock<HashMap<String, f64>>,
    written: RwLock<BTreeMap<String, UserAnalyticsBatch>>,
    failing_users: RwLock<HashSet<String>>,
    exercise_lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_log(&self, log: RawWorkoutLog) {
        self.logs.write().await.push(log);
    }

    pub async fn add_exercise(&self, exercise_id: &str, record: ExerciseRecord) {
        self.exercises
            .write()
            .await
            .insert(exercise_id.to_string(), record);
    }

    pub async fn set_bodyweight(&self, user_id: &str, bodyweight: f64) {
        self.bodyweights
            .write()
            .await
            .insert(user_id.to_string(), bodyweight);
    }

    /// Make every batch write for `user_id` fail
    pub async fn fail_writes_for(&self, user_id: &str) {
        self.failing_users.write().await.insert(user_id.to_string());
    }

    /// The last batch written for `user_id`
    pub async fn written_batch(&self, user_id: &str) -> Option<UserAnalyticsBatch> {
        self.written.read().await.get(user_id).cloned()
    }

    pub async fn written_users(&self) -> Vec<String> {
        self.written.read().await.keys().cloned().collect()
    }

    /// Number of exercise lookups that reached the store
    pub fn exercise_lookups(&self) -> usize {
        self.exercise_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryStore {
    async fn finished_workout_logs(&self) -> Result<Vec<RawWorkoutLog>> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|log| log.is_finished)
            .cloned()
            .collect())
    }

    async fn exercise_record(&self, exercise_id: &str) -> Result<Option<ExerciseRecord>> {
        self.exercise_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.exercises.read().await.get(exercise_id).cloned())
    }

    async fn user_bodyweight(&self, user_id: &str) -> Result<Option<f64>> {
        Ok(self.bodyweights.read().await.get(user_id).copied())
    }

    async fn write_user_batch(&self, batch: &UserAnalyticsBatch) -> Result<()> {
        if self.failing_users.read().await.contains(&batch.user_id) {
            return Err(anyhow::anyhow!(
                "Simulated write failure for user {}",
                batch.user_id
            ));
        }

        self.written
            .write()
            .await
            .insert(batch.user_id.clone(), batch.clone());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
