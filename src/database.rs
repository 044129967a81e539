// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! SQLite-backed document store for workout logs, the exercise catalogue,
//! user profiles and the computed analytics. Documents that are schemaless
//! upstream (exercise entries, analytics records) are kept as JSON text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::time::Instant;
use tracing::{info, warn};

use crate::logging::AppLogger;
use crate::models::{
    ExerciseAnalytics, ExerciseRecord, MonthlyAnalytics, RawWorkoutLog, UserAnalyticsBatch,
};
use crate::storage::AnalyticsStore;

/// A personal record row as persisted, with its denormalized exercise name
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPersonalRecord {
    pub rep_range: String,
    pub exercise_name: String,
    /// Rounded to a whole unit
    pub e1rm: f64,
    pub weight: f64,
    pub reps: i32,
    pub date: DateTime<FixedOffset>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a `completed_date` backfill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BackfillSummary {
    pub documents_processed: u64,
    pub documents_updated: u64,
    pub pages: u64,
}

/// Database manager for workout and analytics storage
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains(":memory:")
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .with_context(|| format!("Failed to connect to {}", database_url))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workout_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                is_finished BOOLEAN NOT NULL DEFAULT 0,
                completed_date TEXT,
                date TEXT,
                exercises TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                name TEXT,
                muscle_group TEXT,
                exercise_type TEXT,
                movement_pattern TEXT,
                equipment TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                bodyweight REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exercise_analytics (
                user_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                e1rm REAL NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, exercise_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS personal_records (
                user_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                rep_range TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                e1rm REAL NOT NULL,
                weight REAL NOT NULL,
                reps INTEGER NOT NULL,
                date TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, exercise_id, rep_range)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS monthly_analytics (
                user_id TEXT NOT NULL,
                month TEXT NOT NULL,
                total_volume REAL NOT NULL,
                total_workouts INTEGER NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, month)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_workout_logs_user ON workout_logs(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert or replace a workout log document
    pub async fn insert_workout_log(&self, log: &RawWorkoutLog) -> Result<()> {
        let exercises = log
            .exercises
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO workout_logs (id, user_id, is_finished, completed_date, date, exercises)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&log.id)
        .bind(&log.user_id)
        .bind(log.is_finished)
        .bind(log.completed_date.map(|d| d.to_rfc3339()))
        .bind(log.date.map(|d| d.to_rfc3339()))
        .bind(exercises)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace an exercise catalogue entry
    pub async fn upsert_exercise(&self, exercise_id: &str, record: &ExerciseRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO exercises (id, name, muscle_group, exercise_type, movement_pattern, equipment)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(exercise_id)
        .bind(&record.name)
        .bind(&record.muscle_group)
        .bind(&record.exercise_type)
        .bind(&record.movement_pattern)
        .bind(&record.equipment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create or update a user's bodyweight
    pub async fn set_user_bodyweight(&self, user_id: &str, bodyweight: Option<f64>) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO users (id, bodyweight) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(bodyweight)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Computed exercise analytics for a user, ordered by exercise id
    pub async fn get_exercise_analytics(&self, user_id: &str) -> Result<Vec<ExerciseAnalytics>> {
        let rows = sqlx::query(
            "SELECT data FROM exercise_analytics WHERE user_id = ?1 ORDER BY exercise_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                serde_json::from_str(&data).context("Corrupt exercise analytics document")
            })
            .collect()
    }

    /// Persisted PR rows for one user and exercise, ordered by rep-range label
    pub async fn get_personal_records(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Vec<StoredPersonalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT rep_range, exercise_name, e1rm, weight, reps, date, updated_at
            FROM personal_records
            WHERE user_id = ?1 AND exercise_id = ?2
            ORDER BY rep_range
            "#,
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| Self::row_to_personal_record(&row)).collect()
    }

    /// Computed monthly analytics for a user, ordered by month
    pub async fn get_monthly_analytics(&self, user_id: &str) -> Result<Vec<MonthlyAnalytics>> {
        let rows = sqlx::query("SELECT data FROM monthly_analytics WHERE user_id = ?1 ORDER BY month")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                serde_json::from_str(&data).context("Corrupt monthly analytics document")
            })
            .collect()
    }

    /// Copy `date` into `completed_date` wherever the latter is missing.
    ///
    /// Pages through `workout_logs` in id order, `batch_size` rows at a time,
    /// with one transaction per page. Rows that already have a
    /// `completed_date` are never touched, so repeated runs are harmless.
    pub async fn backfill_completed_date(&self, batch_size: u32) -> Result<BackfillSummary> {
        if batch_size == 0 {
            return Err(anyhow::anyhow!("Backfill batch size must be positive"));
        }

        let mut summary = BackfillSummary::default();
        let mut last_id: Option<String> = None;

        loop {
            let rows = sqlx::query(
                r#"
                SELECT id, date, completed_date FROM workout_logs
                WHERE ?1 IS NULL OR id > ?1
                ORDER BY id
                LIMIT ?2
                "#,
            )
            .bind(&last_id)
            .bind(i64::from(batch_size))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch backfill page")?;

            if rows.is_empty() {
                break;
            }

            let mut tx = self.pool.begin().await?;
            let mut updates_in_page = 0u64;
            for row in &rows {
                let id: String = row.try_get("id")?;
                let date: Option<String> = row.try_get("date")?;
                let completed_date: Option<String> = row.try_get("completed_date")?;

                if let (Some(date), None) = (date.filter(|d| !d.is_empty()), completed_date) {
                    sqlx::query("UPDATE workout_logs SET completed_date = ?1 WHERE id = ?2")
                        .bind(date)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                    updates_in_page += 1;
                }
            }
            tx.commit().await.context("Failed to commit backfill page")?;

            summary.pages += 1;
            summary.documents_processed += rows.len() as u64;
            summary.documents_updated += updates_in_page;
            info!(
                backfill.page = summary.pages,
                backfill.updated = updates_in_page,
                backfill.processed = summary.documents_processed,
                "Backfill page committed"
            );

            last_id = Some(rows[rows.len() - 1].try_get("id")?);
            if rows.len() < batch_size as usize {
                break;
            }
        }

        Ok(summary)
    }

    fn row_to_raw_log(row: &sqlx::sqlite::SqliteRow) -> Result<RawWorkoutLog> {
        let id: String = row.try_get("id")?;
        let exercises: Option<String> = row.try_get("exercises")?;
        let exercises = exercises.and_then(|json| match serde_json::from_str::<Vec<Value>>(&json) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(log.id = %id, error = %e, "Unreadable exercises document");
                None
            }
        });

        let completed_date: Option<String> = row.try_get("completed_date")?;
        let date: Option<String> = row.try_get("date")?;

        Ok(RawWorkoutLog {
            user_id: row.try_get("user_id")?,
            is_finished: row.try_get("is_finished")?,
            completed_date: parse_date(&id, completed_date.as_deref()),
            date: parse_date(&id, date.as_deref()),
            exercises,
            id,
        })
    }

    fn row_to_personal_record(row: &sqlx::sqlite::SqliteRow) -> Result<StoredPersonalRecord> {
        let date: String = row.try_get("date")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(StoredPersonalRecord {
            rep_range: row.try_get("rep_range")?,
            exercise_name: row.try_get("exercise_name")?,
            e1rm: row.try_get("e1rm")?,
            weight: row.try_get("weight")?,
            reps: row.try_get("reps")?,
            date: DateTime::parse_from_rfc3339(&date)?,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)?.with_timezone(&Utc),
        })
    }
}

/// Unparsable dates count as absent so the log is judged on its other fields
fn parse_date(log_id: &str, value: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let value = value.filter(|v| !v.is_empty())?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(log.id = %log_id, value = %value, error = %e, "Unparsable workout date");
            None
        }
    }
}

#[async_trait]
impl AnalyticsStore for Database {
    async fn finished_workout_logs(&self) -> Result<Vec<RawWorkoutLog>> {
        let started = Instant::now();
        let rows = sqlx::query("SELECT * FROM workout_logs WHERE is_finished = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await;
        AppLogger::log_database_operation(
            "select",
            "workout_logs",
            rows.is_ok(),
            started.elapsed().as_millis() as u64,
        );

        rows?.iter().map(Self::row_to_raw_log).collect()
    }

    async fn exercise_record(&self, exercise_id: &str) -> Result<Option<ExerciseRecord>> {
        let row = sqlx::query("SELECT * FROM exercises WHERE id = ?1")
            .bind(exercise_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(ExerciseRecord {
                name: row.try_get("name")?,
                muscle_group: row.try_get("muscle_group")?,
                exercise_type: row.try_get("exercise_type")?,
                movement_pattern: row.try_get("movement_pattern")?,
                equipment: row.try_get("equipment")?,
            })),
            None => Ok(None),
        }
    }

    async fn user_bodyweight(&self, user_id: &str) -> Result<Option<f64>> {
        let row = sqlx::query("SELECT bodyweight FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get("bodyweight")?),
            None => Ok(None),
        }
    }

    async fn write_user_batch(&self, batch: &UserAnalyticsBatch) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for table in ["exercise_analytics", "personal_records", "monthly_analytics"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?1"))
                .bind(&batch.user_id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to clear {} for {}", table, batch.user_id))?;
        }

        for analytics in &batch.exercises {
            sqlx::query(
                r#"
                INSERT INTO exercise_analytics (user_id, exercise_id, e1rm, data, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&analytics.user_id)
            .bind(&analytics.exercise_id)
            .bind(analytics.e1rm)
            .bind(serde_json::to_string(analytics)?)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;

            for (range, record) in &analytics.prs_by_rep_range {
                sqlx::query(
                    r#"
                    INSERT INTO personal_records
                        (user_id, exercise_id, rep_range, exercise_name, e1rm, weight, reps, date, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )
                .bind(&analytics.user_id)
                .bind(&analytics.exercise_id)
                .bind(range.label())
                .bind(&analytics.metadata.name)
                .bind(record.rounded_e1rm())
                .bind(record.weight)
                .bind(record.reps)
                .bind(record.date.to_rfc3339())
                .bind(&updated_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        for month in &batch.months {
            sqlx::query(
                r#"
                INSERT INTO monthly_analytics (user_id, month, total_volume, total_workouts, data, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&month.user_id)
            .bind(&month.month)
            .bind(month.total_volume)
            .bind(i64::from(month.total_workouts))
            .bind(serde_json::to_string(month)?)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit analytics batch for {}", batch.user_id))?;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseMetadata, PlateauData, PrRecord, RepRange};
    use serde_json::json;
    use std::collections::BTreeMap;

    async fn create_test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn raw_log(id: &str, finished: bool) -> RawWorkoutLog {
        RawWorkoutLog {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            exercises: Some(vec![json!({"exerciseId": "bench", "sets": [{"weight": 100, "reps": 5}]})]),
            completed_date: Some(date("2024-04-02T07:30:00+02:00")),
            date: None,
            is_finished: finished,
        }
    }

    fn analytics() -> ExerciseAnalytics {
        let mut prs = BTreeMap::new();
        prs.insert(
            RepRange::FiveRm,
            PrRecord {
                e1rm: 116.666,
                weight: 100.0,
                reps: 5,
                date: date("2024-04-02T07:30:00+02:00"),
            },
        );
        ExerciseAnalytics {
            user_id: "u1".to_string(),
            exercise_id: "bench".to_string(),
            metadata: ExerciseMetadata {
                name: "Bench Press".to_string(),
                ..ExerciseMetadata::unknown()
            },
            e1rm: 116.666,
            total_volume: 1500.0,
            total_sets: 3,
            total_reps: 15,
            total_effective_reps: 0.0,
            average_intensity: 100.0,
            average_intensity_percent: 0.0,
            intensity_distribution: BTreeMap::new(),
            prs_by_rep_range: prs,
            staleness_score: 0,
            plateau_data: PlateauData::default(),
        }
    }

    #[tokio::test]
    async fn test_only_finished_logs_are_read() {
        let db = create_test_db().await;
        db.insert_workout_log(&raw_log("a", true)).await.unwrap();
        db.insert_workout_log(&raw_log("b", false)).await.unwrap();

        let logs = db.finished_workout_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "a");
        assert_eq!(logs[0].completed_date, Some(date("2024-04-02T07:30:00+02:00")));
        assert_eq!(logs[0].exercises.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reference_lookups() {
        let db = create_test_db().await;
        db.upsert_exercise(
            "bench",
            &ExerciseRecord {
                name: Some("Bench Press".to_string()),
                muscle_group: Some("Chest".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        db.set_user_bodyweight("u1", Some(82.0)).await.unwrap();
        db.set_user_bodyweight("u2", None).await.unwrap();

        let record = db.exercise_record("bench").await.unwrap().unwrap();
        assert_eq!(record.muscle_group.as_deref(), Some("Chest"));
        assert_eq!(record.movement_pattern, None);
        assert!(db.exercise_record("ghost").await.unwrap().is_none());

        assert_eq!(db.user_bodyweight("u1").await.unwrap(), Some(82.0));
        assert_eq!(db.user_bodyweight("u2").await.unwrap(), None);
        assert_eq!(db.user_bodyweight("u3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_write_replaces_previous_rows() {
        let db = create_test_db().await;
        let mut month = MonthlyAnalytics::new("u1", "2024-04");
        month.total_volume = 1500.0;
        month.total_workouts = 1;

        let batch = UserAnalyticsBatch {
            user_id: "u1".to_string(),
            exercises: vec![analytics()],
            months: vec![month.clone()],
        };
        db.write_user_batch(&batch).await.unwrap();
        db.write_user_batch(&batch).await.unwrap();

        let stored = db.get_exercise_analytics("u1").await.unwrap();
        assert_eq!(stored, vec![analytics()]);
        assert_eq!(db.get_monthly_analytics("u1").await.unwrap(), vec![month]);

        let prs = db.get_personal_records("u1", "bench").await.unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].rep_range, "5RM");
        assert_eq!(prs[0].e1rm, 117.0);
        assert_eq!(prs[0].exercise_name, "Bench Press");
    }

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let db = create_test_db().await;
        for i in 0..5 {
            let mut log = raw_log(&format!("log{i}"), true);
            log.completed_date = None;
            log.date = Some(date("2024-01-01T10:00:00Z"));
            db.insert_workout_log(&log).await.unwrap();
        }
        // Already has a completed date
        db.insert_workout_log(&raw_log("log9", true)).await.unwrap();

        let first = db.backfill_completed_date(2).await.unwrap();
        assert_eq!(first.documents_processed, 6);
        assert_eq!(first.documents_updated, 5);
        assert_eq!(first.pages, 3);

        let second = db.backfill_completed_date(2).await.unwrap();
        assert_eq!(second.documents_processed, 6);
        assert_eq!(second.documents_updated, 0);

        let logs = db.finished_workout_logs().await.unwrap();
        assert!(logs.iter().all(|l| l.completed_date.is_some()));
        assert_eq!(
            logs.iter().find(|l| l.id == "log9").unwrap().completed_date,
            Some(date("2024-04-02T07:30:00+02:00"))
        );
    }

    #[tokio::test]
    async fn test_backfill_rejects_zero_batch() {
        let db = create_test_db().await;
        assert!(db.backfill_completed_date(0).await.is_err());
    }
}
