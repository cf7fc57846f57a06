//! The workout store: one lazily opened SQLite database shared by every caller.
//!
//! Nothing touches the disk until the first operation runs. That call opens the
//! file, switches it to WAL mode and applies the schema; concurrent first calls
//! wait on the same initialisation instead of racing it. A failed initialisation
//! leaves the store closed so the next call tries again.

use log::info;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

use crate::db::models::{
    Exercise, ExercisePatch, NewExercise, NewTemplateExercise, NewWorkout, NewWorkoutExercise,
    NewWorkoutTemplate, TemplateEntry, TemplateExerciseDetail, Workout, WorkoutEntry,
    WorkoutExerciseDetail, WorkoutHistoryEntry, WorkoutTemplate,
};
use crate::db::{self, StoreConfig, operations};
use crate::error::Result;

pub struct WorkoutStore {
    config: StoreConfig,
    pool: OnceCell<SqlitePool>,
}

static GLOBAL_STORE: OnceCell<WorkoutStore> = OnceCell::const_new();

/// The process-wide store, backed by [`db::get_db_path`].
pub async fn store() -> &'static WorkoutStore {
    GLOBAL_STORE
        .get_or_init(async || WorkoutStore::new(StoreConfig::new(db::get_db_path().await)))
        .await
}

impl WorkoutStore {
    /// Does not open the database; that happens on first use.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.initialized()
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                info!("Opening workout database at {}", self.config.path.display());
                let pool = db::connect(&self.config).await?;
                if let Err(e) = db::init_database(&pool).await {
                    pool.close().await;
                    return Err(e);
                }
                Ok(pool)
            })
            .await
    }

    /// Flush and close the connection. Later operations on this store fail.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            info!("Closing workout database");
            pool.close().await;
        }
    }

    // Exercises
    pub async fn add_exercise(&self, exercise: &NewExercise) -> Result<i64> {
        operations::add_exercise(self.pool().await?, exercise).await
    }

    pub async fn get_exercise(&self, exercise_id: i64) -> Result<Option<Exercise>> {
        operations::get_exercise(self.pool().await?, exercise_id).await
    }

    pub async fn get_exercises(&self) -> Result<Vec<Exercise>> {
        operations::get_exercises(self.pool().await?).await
    }

    pub async fn update_exercise(
        &self,
        exercise_id: i64,
        patch: ExercisePatch,
    ) -> Result<Exercise> {
        operations::update_exercise(self.pool().await?, exercise_id, patch).await
    }

    pub async fn delete_exercise(&self, exercise_id: i64) -> Result<u64> {
        operations::delete_exercise(self.pool().await?, exercise_id).await
    }

    // Workouts
    pub async fn add_workout(&self, workout: &NewWorkout) -> Result<i64> {
        operations::add_workout(self.pool().await?, workout).await
    }

    pub async fn get_workout(&self, workout_id: i64) -> Result<Option<Workout>> {
        operations::get_workout(self.pool().await?, workout_id).await
    }

    pub async fn get_workouts(&self) -> Result<Vec<Workout>> {
        operations::get_workouts(self.pool().await?).await
    }

    pub async fn delete_workout(&self, workout_id: i64) -> Result<u64> {
        operations::delete_workout(self.pool().await?, workout_id).await
    }

    pub async fn log_workout(&self, workout: &NewWorkout, entries: &[WorkoutEntry]) -> Result<i64> {
        operations::log_workout(self.pool().await?, workout, entries).await
    }

    pub async fn get_workout_history(&self) -> Result<Vec<WorkoutHistoryEntry>> {
        operations::get_workout_history(self.pool().await?).await
    }

    // Workout exercises
    pub async fn add_exercise_to_workout(&self, row: &NewWorkoutExercise) -> Result<i64> {
        operations::add_exercise_to_workout(self.pool().await?, row).await
    }

    pub async fn get_workout_exercises(
        &self,
        workout_id: i64,
    ) -> Result<Vec<WorkoutExerciseDetail>> {
        operations::get_workout_exercises(self.pool().await?, workout_id).await
    }

    // Templates
    pub async fn create_template(&self, template: &NewWorkoutTemplate) -> Result<i64> {
        operations::create_template(self.pool().await?, template).await
    }

    pub async fn create_template_with_exercises(
        &self,
        template: &NewWorkoutTemplate,
        entries: &[TemplateEntry],
    ) -> Result<i64> {
        operations::create_template_with_exercises(self.pool().await?, template, entries).await
    }

    pub async fn get_template(&self, template_id: i64) -> Result<Option<WorkoutTemplate>> {
        operations::get_template(self.pool().await?, template_id).await
    }

    pub async fn get_templates(&self) -> Result<Vec<WorkoutTemplate>> {
        operations::get_templates(self.pool().await?).await
    }

    pub async fn delete_template(&self, template_id: i64) -> Result<u64> {
        operations::delete_template(self.pool().await?, template_id).await
    }

    pub async fn add_exercise_to_template(&self, row: &NewTemplateExercise) -> Result<i64> {
        operations::add_exercise_to_template(self.pool().await?, row).await
    }

    pub async fn get_template_exercises(
        &self,
        template_id: i64,
    ) -> Result<Vec<TemplateExerciseDetail>> {
        operations::get_template_exercises(self.pool().await?, template_id).await
    }

    pub async fn start_workout_from_template(&self, template_id: i64) -> Result<i64> {
        operations::start_workout_from_template(self.pool().await?, template_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_new_store_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy.db");
        let store = WorkoutStore::new(StoreConfig::new(&path));

        assert!(!store.is_initialized());
        assert!(!path.exists());

        assert!(store.get_exercises().await.unwrap().is_empty());
        assert!(store.is_initialized());
        assert!(path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_initialise_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WorkoutStore::new(StoreConfig::new(
            dir.path().join("race.db"),
        )));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .add_exercise(&NewExercise::new(format!("Exercise {i}"), "Chest"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pool = store.pool().await.unwrap();
        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(store.get_exercises().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_failed_open_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("not-yet");
        let store = WorkoutStore::new(StoreConfig::new(parent.join("retry.db")));

        let err = store.get_templates().await.unwrap_err();
        assert!(matches!(err, crate::error::StoreError::Init { .. }), "{err}");
        assert!(!store.is_initialized());

        std::fs::create_dir(&parent).unwrap();
        assert!(store.get_templates().await.unwrap().is_empty());
        assert!(store.is_initialized());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.db");

        let first = WorkoutStore::new(StoreConfig::new(&path));
        let id = first
            .add_exercise(&NewExercise::new("Deadlift", "Back"))
            .await
            .unwrap();
        first.close().await;

        let second = WorkoutStore::new(StoreConfig::new(&path));
        let exercise = second.get_exercise(id).await.unwrap().unwrap();
        assert_eq!(exercise.name, "Deadlift");
    }
}
