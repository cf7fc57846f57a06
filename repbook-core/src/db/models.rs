use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Muscle-group labels suggested when adding an exercise. Any other label is accepted.
pub const MUSCLE_GROUPS: &[&str] = &[
    "Chest",
    "Back",
    "Triceps",
    "Biceps",
    "Shoulders",
    "Quads",
    "Glutes",
    "Hamstrings",
    "Calves",
    "Traps",
    "Forearms",
    "Abs",
];

// Exercise models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "muscleGroup")]
    pub muscle_group: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
    pub name: String,
    pub muscle_group: String,
}

impl NewExercise {
    pub fn new(name: impl Into<String>, muscle_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            muscle_group: muscle_group.into(),
        }
    }
}

/// Fields to overwrite on an existing exercise. `None` keeps the stored value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePatch {
    pub name: Option<String>,
    pub muscle_group: Option<String>,
}

impl ExercisePatch {
    /// Merge the patch over `current`, producing the full row to write back.
    pub fn apply(self, current: Exercise) -> Exercise {
        Exercise {
            id: current.id,
            name: self.name.unwrap_or(current.name),
            muscle_group: self.muscle_group.unwrap_or(current.muscle_group),
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.name, self.muscle_group)
    }
}

// Workout models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    /// ISO-8601 timestamp.
    pub date: String,
    /// Minutes.
    pub duration: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub name: String,
    pub date: String,
    pub duration: i64,
}

/// `45min`, `1h 5min`
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{}min", minutes);
    }
    format!("{}h {}min", minutes / 60, minutes % 60)
}

impl fmt::Display for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} on {} ({})",
            self.id,
            self.name,
            self.date,
            format_duration(self.duration)
        )
    }
}

// Workout exercise models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkoutExercise {
    pub workout_id: i64,
    pub exercise_id: i64,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
}

/// A logged exercise inside a workout that has not been written yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutEntry {
    pub exercise_id: i64,
    pub sets: i64,
    pub reps: i64,
    pub weight: f64,
}

/// A workout exercise joined with the exercise it refers to.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExerciseDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: WorkoutExercise,
    pub name: String,
    #[sqlx(rename = "muscleGroup")]
    pub muscle_group: String,
}

impl fmt::Display for WorkoutExerciseDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}x{} @ {}lbs",
            self.name, self.entry.sets, self.entry.reps, self.entry.weight
        )
    }
}

/// A workout together with everything logged in it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutHistoryEntry {
    #[serde(flatten)]
    pub workout: Workout,
    pub exercises: Vec<WorkoutExerciseDetail>,
}

// Template models
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutTemplate {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewWorkoutTemplate {
    pub name: String,
}

impl fmt::Display for WorkoutTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.name)
    }
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExercise {
    pub id: i64,
    pub template_id: i64,
    pub exercise_id: i64,
    pub set_count: i64,
    pub target_reps: i64,
    pub target_weight: Option<f64>,
    #[sqlx(rename = "order_index")]
    pub order: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplateExercise {
    pub template_id: i64,
    pub exercise_id: i64,
    pub set_count: i64,
    pub target_reps: i64,
    pub target_weight: Option<f64>,
    pub order: i64,
}

/// A prescribed exercise for a template that has not been written yet;
/// its position is taken from where it sits in the list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    pub exercise_id: i64,
    pub set_count: i64,
    pub target_reps: i64,
    pub target_weight: Option<f64>,
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExerciseDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: TemplateExercise,
    pub name: String,
    #[sqlx(rename = "muscleGroup")]
    pub muscle_group: String,
}

impl TemplateExerciseDetail {
    /// The exercise row this prescription turns into when a workout starts.
    /// An unspecified target weight is logged as 0.
    pub fn to_workout_exercise(&self, workout_id: i64) -> NewWorkoutExercise {
        NewWorkoutExercise {
            workout_id,
            exercise_id: self.entry.exercise_id,
            sets: self.entry.set_count,
            reps: self.entry.target_reps,
            weight: self.entry.target_weight.unwrap_or(0.0),
        }
    }
}

impl fmt::Display for TemplateExerciseDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let weight = self
            .entry
            .target_weight
            .map(|w| format!(" @ {}lbs", w))
            .unwrap_or_default();
        write!(
            f,
            "{}. {} - {}x{}{}",
            self.entry.order + 1,
            self.name,
            self.entry.set_count,
            self.entry.target_reps,
            weight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench_press() -> Exercise {
        Exercise {
            id: 7,
            name: "Bench Press".to_string(),
            muscle_group: "Chest".to_string(),
        }
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let patch = ExercisePatch {
            name: Some("Incline Bench".to_string()),
            muscle_group: None,
        };
        let merged = patch.apply(bench_press());
        assert_eq!(merged.id, 7);
        assert_eq!(merged.name, "Incline Bench");
        assert_eq!(merged.muscle_group, "Chest");
    }

    #[test]
    fn empty_patch_is_identity() {
        assert_eq!(ExercisePatch::default().apply(bench_press()), bench_press());
    }

    #[test]
    fn formats_durations_like_history_view() {
        assert_eq!(format_duration(0), "0min");
        assert_eq!(format_duration(45), "45min");
        assert_eq!(format_duration(60), "1h 0min");
        assert_eq!(format_duration(65), "1h 5min");
    }

    #[test]
    fn missing_target_weight_becomes_zero() {
        let detail = TemplateExerciseDetail {
            entry: TemplateExercise {
                id: 1,
                template_id: 2,
                exercise_id: 3,
                set_count: 4,
                target_reps: 8,
                target_weight: None,
                order: 0,
            },
            name: "Pull Up".to_string(),
            muscle_group: "Back".to_string(),
        };
        let row = detail.to_workout_exercise(9);
        assert_eq!(row.workout_id, 9);
        assert_eq!(row.exercise_id, 3);
        assert_eq!(row.sets, 4);
        assert_eq!(row.reps, 8);
        assert_eq!(row.weight, 0.0);
        assert_eq!(detail.to_string(), "1. Pull Up - 4x8");
    }

    #[test]
    fn joined_row_display() {
        let detail = WorkoutExerciseDetail {
            entry: WorkoutExercise {
                id: 1,
                workout_id: 1,
                exercise_id: 1,
                sets: 3,
                reps: 10,
                weight: 135.0,
            },
            name: "Bench Press".to_string(),
            muscle_group: "Chest".to_string(),
        };
        assert_eq!(detail.to_string(), "Bench Press - 3x10 @ 135lbs");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(bench_press()).unwrap();
        assert_eq!(value["muscleGroup"], "Chest");
    }
}
