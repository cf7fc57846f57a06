use repbook::db::{self, StoreConfig};
use repbook::models::{NewExercise, NewTemplateExercise, NewWorkoutTemplate};
use repbook::{WorkoutStore, store};

async fn push_day(store: &WorkoutStore, target_weight: Option<f64>) -> i64 {
    let exercise_id = store
        .add_exercise(&NewExercise::new("Bench Press", "Chest"))
        .await
        .unwrap();
    let template_id = store
        .create_template(&NewWorkoutTemplate {
            name: "Push Day".to_string(),
        })
        .await
        .unwrap();
    store
        .add_exercise_to_template(&NewTemplateExercise {
            template_id,
            exercise_id,
            set_count: 3,
            target_reps: 10,
            target_weight,
            order: 0,
        })
        .await
        .unwrap();
    template_id
}

// The global store is bound to the runtime of the test that first opens it,
// so everything touching it lives in this one test.
#[tokio::test]
async fn global_store_starts_workout_from_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workout.db");
    db::set_db_path(&path).unwrap();

    let store = store().await;
    assert!(!store.is_initialized());

    let template_id = push_day(store, Some(135.0)).await;
    assert_eq!(template_id, 1);
    assert!(path.exists());

    let workout_id = store.start_workout_from_template(template_id).await.unwrap();
    let workout = store.get_workout(workout_id).await.unwrap().unwrap();
    assert_eq!(workout.name, "Push Day");
    assert_eq!(workout.duration, 0);

    let rows = store.get_workout_exercises(workout_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.entry.sets, 3);
    assert_eq!(row.entry.reps, 10);
    assert_eq!(row.entry.weight, 135.0);
    assert_eq!(row.name, "Bench Press");
    assert_eq!(row.muscle_group, "Chest");

    assert!(db::set_db_path("elsewhere.db").is_err());
    store.close().await;
}

#[tokio::test]
async fn unspecified_target_weight_starts_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    let store = WorkoutStore::new(StoreConfig::new(dir.path().join("null-weight.db")));
    let template_id = push_day(&store, None).await;

    let workout_id = store.start_workout_from_template(template_id).await.unwrap();
    let rows = store.get_workout_exercises(workout_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entry.weight, 0.0);
}

#[tokio::test]
async fn missing_template_creates_no_workout() {
    let dir = tempfile::tempdir().unwrap();
    let store = WorkoutStore::new(StoreConfig::new(dir.path().join("missing.db")));

    let err = store.start_workout_from_template(1).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Template with id 1 not found");
    assert!(store.get_workouts().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_template_leaves_started_workouts_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = WorkoutStore::new(StoreConfig::new(dir.path().join("history.db")));
    let template_id = push_day(&store, Some(95.0)).await;

    let workout_id = store.start_workout_from_template(template_id).await.unwrap();
    store.delete_template(template_id).await.unwrap();

    let history = store.get_workout_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].workout.id, workout_id);
    assert_eq!(history[0].exercises[0].to_string(), "Bench Press - 3x10 @ 95lbs");
}
