use anyhow::{Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenvy::dotenv;
use log::debug;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

use repbook::db::{self, operations::current_timestamp};
use repbook::logging;
use repbook::models::{
    ExercisePatch, MUSCLE_GROUPS, NewExercise, NewTemplateExercise, NewWorkout,
    NewWorkoutExercise, NewWorkoutTemplate, TemplateEntry, WorkoutEntry,
};
use repbook::{WorkoutStore, store};

#[derive(Parser, Debug)]
#[command(version, about = "Repbook - Workout Tracker CLI", long_about = None)]
struct Args {
    /// Database file (defaults to $REPBOOK_DB, then ./workout.db)
    #[arg(long, global = true, env = "REPBOOK_DB")]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the exercise catalogue
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    /// Log and review workouts
    #[command(subcommand)]
    Workout(WorkoutCommand),
    /// Manage workout templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Start a new workout from a template
    Start { template_id: i64 },
}

#[derive(Subcommand, Debug)]
enum ExerciseCommand {
    Add { name: String, muscle_group: String },
    List,
    Show { id: i64 },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        muscle_group: Option<String>,
    },
    Delete { id: i64 },
    /// List the suggested muscle groups
    MuscleGroups,
}

#[derive(Subcommand, Debug)]
enum WorkoutCommand {
    /// Record a workout with its exercises
    Log {
        name: String,
        /// Minutes
        #[arg(long, default_value_t = 0)]
        duration: i64,
        /// ISO-8601 timestamp, defaults to now
        #[arg(long)]
        date: Option<String>,
        /// EXERCISE_ID:SETS:REPS:WEIGHT, repeatable
        #[arg(short, long = "exercise", value_parser = parse_workout_entry)]
        exercises: Vec<WorkoutEntry>,
    },
    AddExercise(WorkoutExerciseArgs),
    List,
    Show { id: i64 },
    Delete { id: i64 },
    /// Every workout with its exercises, most recent first
    History,
}

#[derive(ClapArgs, Debug)]
struct WorkoutExerciseArgs {
    workout_id: i64,
    exercise_id: i64,
    sets: i64,
    reps: i64,
    weight: f64,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    Create {
        name: String,
        /// EXERCISE_ID:SETS:REPS[:WEIGHT], repeatable, kept in the given order
        #[arg(short, long = "exercise", value_parser = parse_template_entry)]
        exercises: Vec<TemplateEntry>,
    },
    AddExercise {
        template_id: i64,
        exercise_id: i64,
        set_count: i64,
        target_reps: i64,
        #[arg(long)]
        target_weight: Option<f64>,
        /// Position in the template, defaults to after the last exercise
        #[arg(long)]
        order: Option<i64>,
    },
    List,
    Show { id: i64 },
    Delete { id: i64 },
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {}: {:?}", field, value))
}

fn parse_workout_entry(s: &str) -> Result<WorkoutEntry, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected EXERCISE_ID:SETS:REPS:WEIGHT, got {:?}",
            s
        ));
    }
    Ok(WorkoutEntry {
        exercise_id: parse_number("exercise id", parts[0])?,
        sets: parse_number("sets", parts[1])?,
        reps: parse_number("reps", parts[2])?,
        weight: parse_number("weight", parts[3])?,
    })
}

fn parse_template_entry(s: &str) -> Result<TemplateEntry, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!(
            "expected EXERCISE_ID:SETS:REPS[:WEIGHT], got {:?}",
            s
        ));
    }
    let target_weight = match parts.get(3) {
        Some(w) if !w.trim().is_empty() => Some(parse_number("weight", w)?),
        _ => None,
    };
    Ok(TemplateEntry {
        exercise_id: parse_number("exercise id", parts[0])?,
        set_count: parse_number("sets", parts[1])?,
        target_reps: parse_number("reps", parts[2])?,
        target_weight,
    })
}

struct Output {
    json: bool,
}

impl Output {
    fn one<T: Serialize + Display>(&self, item: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            println!("{}", item);
        }
        Ok(())
    }

    fn list<T: Serialize + Display>(&self, items: &[T], empty: &str) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(items)?);
        } else if items.is_empty() {
            println!("{}", empty);
        } else {
            for item in items {
                println!("{}", item);
            }
        }
        Ok(())
    }

    fn created(&self, what: &str, id: i64) -> Result<()> {
        if self.json {
            println!("{}", serde_json::json!({ "id": id }));
        } else {
            println!("Created {} #{}", what, id);
        }
        Ok(())
    }

    fn deleted(&self, what: &str, id: i64, rows: u64) -> Result<()> {
        if self.json {
            println!("{}", serde_json::json!({ "id": id, "deleted": rows > 0 }));
        } else if rows > 0 {
            println!("Deleted {} #{}", what, id);
        } else {
            println!("No {} #{}", what, id);
        }
        Ok(())
    }
}

async fn run_exercise(store: &WorkoutStore, out: &Output, command: ExerciseCommand) -> Result<()> {
    match command {
        ExerciseCommand::Add { name, muscle_group } => {
            let id = store
                .add_exercise(&NewExercise::new(name, muscle_group))
                .await?;
            out.created("exercise", id)
        }
        ExerciseCommand::List => out.list(&store.get_exercises().await?, "No exercises yet"),
        ExerciseCommand::Show { id } => {
            let exercise = store
                .get_exercise(id)
                .await?
                .ok_or_else(|| anyhow!("Exercise #{} not found", id))?;
            out.one(&exercise)
        }
        ExerciseCommand::Update {
            id,
            name,
            muscle_group,
        } => {
            let updated = store
                .update_exercise(id, ExercisePatch { name, muscle_group })
                .await?;
            out.one(&updated)
        }
        ExerciseCommand::Delete { id } => {
            let rows = store.delete_exercise(id).await?;
            out.deleted("exercise", id, rows)
        }
        ExerciseCommand::MuscleGroups => out.list(MUSCLE_GROUPS, ""),
    }
}

async fn run_workout(store: &WorkoutStore, out: &Output, command: WorkoutCommand) -> Result<()> {
    match command {
        WorkoutCommand::Log {
            name,
            duration,
            date,
            exercises,
        } => {
            let workout = NewWorkout {
                name,
                date: date.unwrap_or_else(current_timestamp),
                duration,
            };
            let id = store.log_workout(&workout, &exercises).await?;
            out.created("workout", id)
        }
        WorkoutCommand::AddExercise(args) => {
            let id = store
                .add_exercise_to_workout(&NewWorkoutExercise {
                    workout_id: args.workout_id,
                    exercise_id: args.exercise_id,
                    sets: args.sets,
                    reps: args.reps,
                    weight: args.weight,
                })
                .await?;
            out.created("workout exercise", id)
        }
        WorkoutCommand::List => out.list(&store.get_workouts().await?, "No workouts yet"),
        WorkoutCommand::Show { id } => {
            let workout = store
                .get_workout(id)
                .await?
                .ok_or_else(|| anyhow!("Workout #{} not found", id))?;
            let exercises = store.get_workout_exercises(id).await?;
            if out.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "workout": workout,
                        "exercises": exercises,
                    }))?
                );
                return Ok(());
            }
            println!("{}", workout);
            out.list(&exercises, "  (no exercises)")
        }
        WorkoutCommand::Delete { id } => {
            let rows = store.delete_workout(id).await?;
            out.deleted("workout", id, rows)
        }
        WorkoutCommand::History => {
            let history = store.get_workout_history().await?;
            if out.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
                return Ok(());
            }
            if history.is_empty() {
                println!("No workouts yet");
            }
            for entry in &history {
                println!("{}", entry.workout);
                for exercise in &entry.exercises {
                    println!("  {}", exercise);
                }
            }
            Ok(())
        }
    }
}

async fn run_template(store: &WorkoutStore, out: &Output, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::Create { name, exercises } => {
            let template = NewWorkoutTemplate { name };
            let id = store
                .create_template_with_exercises(&template, &exercises)
                .await?;
            out.created("template", id)
        }
        TemplateCommand::AddExercise {
            template_id,
            exercise_id,
            set_count,
            target_reps,
            target_weight,
            order,
        } => {
            let order = match order {
                Some(order) => order,
                None => store
                    .get_template_exercises(template_id)
                    .await?
                    .iter()
                    .map(|e| e.entry.order + 1)
                    .max()
                    .unwrap_or(0),
            };
            let id = store
                .add_exercise_to_template(&NewTemplateExercise {
                    template_id,
                    exercise_id,
                    set_count,
                    target_reps,
                    target_weight,
                    order,
                })
                .await?;
            out.created("template exercise", id)
        }
        TemplateCommand::List => {
            out.list(&store.get_templates().await?, "No workout templates yet")
        }
        TemplateCommand::Show { id } => {
            let template = store
                .get_template(id)
                .await?
                .ok_or_else(|| anyhow!("Template #{} not found", id))?;
            let exercises = store.get_template_exercises(id).await?;
            if out.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "template": template,
                        "exercises": exercises,
                    }))?
                );
                return Ok(());
            }
            println!("{}", template);
            out.list(&exercises, "  (no exercises)")
        }
        TemplateCommand::Delete { id } => {
            let rows = store.delete_template(id).await?;
            out.deleted("template", id, rows)
        }
    }
}

async fn run(store: &WorkoutStore, out: &Output, command: Commands) -> Result<()> {
    match command {
        Commands::Exercise(command) => run_exercise(store, out, command).await,
        Commands::Workout(command) => run_workout(store, out, command).await,
        Commands::Template(command) => run_template(store, out, command).await,
        Commands::Start { template_id } => {
            let id = store.start_workout_from_template(template_id).await?;
            out.created("workout", id)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    if !logging::set_log_level(&args.log_level) {
        return Err(anyhow!("Unknown log level: {}", args.log_level));
    }

    if let Some(path) = args.db {
        db::set_db_path(path).map_err(|p| anyhow!("Database path already set to {}", p.display()))?;
    }

    let store = store().await;
    debug!("Using database {}", store.config().path.display());

    let out = Output { json: args.json };
    let result = run(store, &out, args.command).await;
    store.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_workout_entry() {
        let entry = parse_workout_entry("4:3:10:135.5").unwrap();
        assert_eq!(
            entry,
            WorkoutEntry {
                exercise_id: 4,
                sets: 3,
                reps: 10,
                weight: 135.5,
            }
        );
    }

    #[test]
    fn rejects_short_workout_entry() {
        assert!(parse_workout_entry("4:3:10").is_err());
        assert!(parse_workout_entry("4:three:10:100").is_err());
    }

    #[test]
    fn template_entry_weight_is_optional() {
        let entry = parse_template_entry("2:5:5").unwrap();
        assert_eq!(entry.target_weight, None);
        let entry = parse_template_entry("2:5:5:225").unwrap();
        assert_eq!(entry.target_weight, Some(225.0));
        let entry = parse_template_entry("2:5:5:").unwrap();
        assert_eq!(entry.target_weight, None);
    }

    #[test]
    fn parses_start_command() {
        let args = Args::try_parse_from(["repbook", "--db", "/tmp/x.db", "start", "3"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(args.command, Commands::Start { template_id: 3 }));
    }

    #[test]
    fn parses_repeated_template_exercises() {
        let args = Args::try_parse_from([
            "repbook", "template", "create", "Push Day", "-e", "1:3:10:135", "-e", "2:3:12",
        ])
        .unwrap();
        match args.command {
            Commands::Template(TemplateCommand::Create { name, exercises }) => {
                assert_eq!(name, "Push Day");
                assert_eq!(exercises.len(), 2);
                assert_eq!(exercises[1].exercise_id, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
