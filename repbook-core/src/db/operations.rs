use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{
    Exercise, ExercisePatch, NewExercise, NewTemplateExercise, NewWorkout, NewWorkoutExercise,
    NewWorkoutTemplate, TemplateEntry, TemplateExerciseDetail, Workout, WorkoutEntry,
    WorkoutExerciseDetail, WorkoutHistoryEntry, WorkoutTemplate,
};
use crate::error::{Result, StoreError};

const SELECT_WORKOUT_EXERCISES: &str = "SELECT we.*, e.name, e.muscleGroup
     FROM workout_exercises we
     JOIN exercises e ON we.exercise_id = e.id
     WHERE we.workout_id = ?1";

const SELECT_TEMPLATE_EXERCISES: &str = "SELECT te.*, e.name, e.muscleGroup
     FROM template_exercises te
     JOIN exercises e ON te.exercise_id = e.id
     WHERE te.template_id = ?1
     ORDER BY te.order_index, te.id";

/// ISO-8601 timestamp in UTC with millisecond precision, e.g. `2024-03-02T18:15:00.000Z`.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Exercises
pub async fn add_exercise(pool: &SqlitePool, exercise: &NewExercise) -> Result<i64> {
    debug!("Adding exercise {:?}", exercise.name);
    let result = sqlx::query("INSERT INTO exercises (name, muscleGroup) VALUES (?1, ?2)")
        .bind(&exercise.name)
        .bind(&exercise.muscle_group)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_exercise(pool: &SqlitePool, exercise_id: i64) -> Result<Option<Exercise>> {
    fetch_exercise(pool, exercise_id).await
}

async fn fetch_exercise<'e, E>(executor: E, exercise_id: i64) -> Result<Option<Exercise>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
}

pub async fn get_exercises(pool: &SqlitePool) -> Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>("SELECT * FROM exercises")
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

/// Merge `patch` over the stored exercise and write every column back.
pub async fn update_exercise(
    pool: &SqlitePool,
    exercise_id: i64,
    patch: ExercisePatch,
) -> Result<Exercise> {
    debug!("Updating exercise {}", exercise_id);
    let mut tx = pool.begin().await?;

    let current = fetch_exercise(&mut *tx, exercise_id)
        .await?
        .ok_or_else(|| StoreError::not_found("Exercise", exercise_id))?;
    let updated = patch.apply(current);

    sqlx::query("UPDATE exercises SET name = ?1, muscleGroup = ?2 WHERE id = ?3")
        .bind(&updated.name)
        .bind(&updated.muscle_group)
        .bind(updated.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(updated)
}

/// Deleting a missing exercise is not an error; the affected row count is returned.
pub async fn delete_exercise(pool: &SqlitePool, exercise_id: i64) -> Result<u64> {
    debug!("Deleting exercise {}", exercise_id);
    let result = sqlx::query("DELETE FROM exercises WHERE id = ?1")
        .bind(exercise_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// Workouts
async fn insert_workout<'e, E>(executor: E, workout: &NewWorkout) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO workouts (name, date, duration) VALUES (?1, ?2, ?3)")
        .bind(&workout.name)
        .bind(&workout.date)
        .bind(workout.duration)
        .execute(executor)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn add_workout(pool: &SqlitePool, workout: &NewWorkout) -> Result<i64> {
    debug!("Adding workout {:?} dated {}", workout.name, workout.date);
    insert_workout(pool, workout).await
}

pub async fn get_workout(pool: &SqlitePool, workout_id: i64) -> Result<Option<Workout>> {
    sqlx::query_as::<_, Workout>("SELECT * FROM workouts WHERE id = ?1")
        .bind(workout_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
}

/// Most recent first.
pub async fn get_workouts(pool: &SqlitePool) -> Result<Vec<Workout>> {
    sqlx::query_as::<_, Workout>("SELECT * FROM workouts ORDER BY date DESC, id DESC")
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

pub async fn delete_workout(pool: &SqlitePool, workout_id: i64) -> Result<u64> {
    debug!("Deleting workout {}", workout_id);
    let result = sqlx::query("DELETE FROM workouts WHERE id = ?1")
        .bind(workout_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Insert a workout and all of its exercises in one transaction.
pub async fn log_workout(
    pool: &SqlitePool,
    workout: &NewWorkout,
    entries: &[WorkoutEntry],
) -> Result<i64> {
    debug!(
        "Logging workout {:?} with {} exercises",
        workout.name,
        entries.len()
    );
    let mut tx = pool.begin().await?;

    let workout_id = insert_workout(&mut *tx, workout).await?;
    for entry in entries {
        let row = NewWorkoutExercise {
            workout_id,
            exercise_id: entry.exercise_id,
            sets: entry.sets,
            reps: entry.reps,
            weight: entry.weight,
        };
        insert_workout_exercise(&mut *tx, &row).await?;
    }

    tx.commit().await?;
    Ok(workout_id)
}

/// Every workout, most recent first, with its logged exercises.
pub async fn get_workout_history(pool: &SqlitePool) -> Result<Vec<WorkoutHistoryEntry>> {
    let workouts = get_workouts(pool).await?;
    let mut history = Vec::with_capacity(workouts.len());
    for workout in workouts {
        let exercises = get_workout_exercises(pool, workout.id).await?;
        history.push(WorkoutHistoryEntry { workout, exercises });
    }
    Ok(history)
}

// Workout exercises
async fn insert_workout_exercise<'e, E>(executor: E, row: &NewWorkoutExercise) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO workout_exercises (workout_id, exercise_id, sets, reps, weight)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(row.workout_id)
    .bind(row.exercise_id)
    .bind(row.sets)
    .bind(row.reps)
    .bind(row.weight)
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn add_exercise_to_workout(pool: &SqlitePool, row: &NewWorkoutExercise) -> Result<i64> {
    debug!(
        "Adding exercise {} to workout {}",
        row.exercise_id, row.workout_id
    );
    insert_workout_exercise(pool, row).await
}

pub async fn get_workout_exercises(
    pool: &SqlitePool,
    workout_id: i64,
) -> Result<Vec<WorkoutExerciseDetail>> {
    sqlx::query_as::<_, WorkoutExerciseDetail>(SELECT_WORKOUT_EXERCISES)
        .bind(workout_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

// Templates
async fn insert_template<'e, E>(executor: E, template: &NewWorkoutTemplate) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO workout_templates (name) VALUES (?1)")
        .bind(&template.name)
        .execute(executor)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn create_template(pool: &SqlitePool, template: &NewWorkoutTemplate) -> Result<i64> {
    debug!("Creating template {:?}", template.name);
    insert_template(pool, template).await
}

/// Create a template and its exercises in one transaction. Entries are
/// numbered `0..N-1` in the order given.
pub async fn create_template_with_exercises(
    pool: &SqlitePool,
    template: &NewWorkoutTemplate,
    entries: &[TemplateEntry],
) -> Result<i64> {
    debug!(
        "Creating template {:?} with {} exercises",
        template.name,
        entries.len()
    );
    let mut tx = pool.begin().await?;

    let template_id = insert_template(&mut *tx, template).await?;
    for (order, entry) in (0_i64..).zip(entries) {
        let row = NewTemplateExercise {
            template_id,
            exercise_id: entry.exercise_id,
            set_count: entry.set_count,
            target_reps: entry.target_reps,
            target_weight: entry.target_weight,
            order,
        };
        insert_template_exercise(&mut *tx, &row).await?;
    }

    tx.commit().await?;
    Ok(template_id)
}

async fn fetch_template<'e, E>(executor: E, template_id: i64) -> Result<Option<WorkoutTemplate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, WorkoutTemplate>("SELECT * FROM workout_templates WHERE id = ?1")
        .bind(template_id)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
}

pub async fn get_template(pool: &SqlitePool, template_id: i64) -> Result<Option<WorkoutTemplate>> {
    fetch_template(pool, template_id).await
}

pub async fn get_templates(pool: &SqlitePool) -> Result<Vec<WorkoutTemplate>> {
    sqlx::query_as::<_, WorkoutTemplate>("SELECT * FROM workout_templates")
        .fetch_all(pool)
        .await
        .map_err(Into::into)
}

pub async fn delete_template(pool: &SqlitePool, template_id: i64) -> Result<u64> {
    debug!("Deleting template {}", template_id);
    let result = sqlx::query("DELETE FROM workout_templates WHERE id = ?1")
        .bind(template_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// Template exercises
async fn insert_template_exercise<'e, E>(executor: E, row: &NewTemplateExercise) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO template_exercises
         (template_id, exercise_id, set_count, target_reps, target_weight, order_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(row.template_id)
    .bind(row.exercise_id)
    .bind(row.set_count)
    .bind(row.target_reps)
    .bind(row.target_weight)
    .bind(row.order)
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn add_exercise_to_template(
    pool: &SqlitePool,
    row: &NewTemplateExercise,
) -> Result<i64> {
    debug!(
        "Adding exercise {} to template {} at position {}",
        row.exercise_id, row.template_id, row.order
    );
    insert_template_exercise(pool, row).await
}

async fn fetch_template_exercises<'e, E>(
    executor: E,
    template_id: i64,
) -> Result<Vec<TemplateExerciseDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TemplateExerciseDetail>(SELECT_TEMPLATE_EXERCISES)
        .bind(template_id)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
}

/// Ordered by position within the template.
pub async fn get_template_exercises(
    pool: &SqlitePool,
    template_id: i64,
) -> Result<Vec<TemplateExerciseDetail>> {
    fetch_template_exercises(pool, template_id).await
}

// Starting a workout
async fn materialize_template(conn: &mut SqliteConnection, template_id: i64) -> Result<i64> {
    let template = fetch_template(&mut *conn, template_id)
        .await?
        .ok_or_else(|| StoreError::not_found("Template", template_id))?;

    let workout_id = insert_workout(
        &mut *conn,
        &NewWorkout {
            name: template.name,
            date: current_timestamp(),
            duration: 0,
        },
    )
    .await?;

    let prescribed = fetch_template_exercises(&mut *conn, template_id).await?;
    for exercise in &prescribed {
        insert_workout_exercise(&mut *conn, &exercise.to_workout_exercise(workout_id)).await?;
    }

    debug!(
        "Started workout {} from template {} with {} exercises",
        workout_id,
        template_id,
        prescribed.len()
    );
    Ok(workout_id)
}

/// Create a workout named after the template, dated now, with one exercise
/// row per template exercise. Either everything is written or nothing is.
pub async fn start_workout_from_template(pool: &SqlitePool, template_id: i64) -> Result<i64> {
    let mut tx = pool.begin().await?;

    match materialize_template(&mut *tx, template_id).await {
        Ok(workout_id) => {
            tx.commit().await?;
            Ok(workout_id)
        }
        Err(e) => {
            warn!(
                "Starting workout from template {} failed, rolling back: {}",
                template_id, e
            );
            if let Err(rollback) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            Err(e)
        }
    }
}
