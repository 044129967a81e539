// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use async_trait::async_trait;

use crate::database::Database;
use crate::models::{ExerciseRecord, RawWorkoutLog, UserAnalyticsBatch};

pub mod memory;

/// Document store the analytics run reads from and writes back to
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Every workout log flagged as finished, in no particular order
    async fn finished_workout_logs(&self) -> Result<Vec<RawWorkoutLog>>;

    async fn exercise_record(&self, exercise_id: &str) -> Result<Option<ExerciseRecord>>;

    async fn user_bodyweight(&self, user_id: &str) -> Result<Option<f64>>;

    /// Replace everything previously written for the batch's user
    async fn write_user_batch(&self, batch: &UserAnalyticsBatch) -> Result<()>;

    fn store_name(&self) -> &'static str;
}

pub async fn open_store(url: &str) -> Result<Box<dyn AnalyticsStore>> {
    match url {
        "memory" => Ok(Box::new(memory::InMemoryStore::new())),
        url if url.starts_with("sqlite:") => Ok(Box::new(Database::new(url).await?)),
        _ => Err(anyhow::anyhow!(
            "Unknown store: {}. Currently supported: memory, sqlite:<path>",
            url
        )),
    }
}
