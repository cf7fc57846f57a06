pub mod models;
pub mod operations;

use log::{debug, info};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::error::{Result, StoreError};

pub const DB_PATH_ENV: &str = "REPBOOK_DB";
pub const DEFAULT_DB_FILE: &str = "workout.db";

static DB_PATH: OnceCell<PathBuf> = OnceCell::const_new();

/// Path of the process-wide database: the value given to [`set_db_path`],
/// else `$REPBOOK_DB`, else `workout.db` in the working directory.
pub async fn get_db_path() -> &'static PathBuf {
    DB_PATH
        .get_or_init(async || {
            env::var(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_FILE))
        })
        .await
}

/// Pin the process-wide database path. Fails once the path has been resolved.
pub fn set_db_path(path: impl Into<PathBuf>) -> std::result::Result<(), PathBuf> {
    DB_PATH.set(path.into()).map_err(|e| match e {
        tokio::sync::SetError::AlreadyInitializedError(p) => p,
        tokio::sync::SetError::InitializingError(p) => p,
    })
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Open the database file (creating it when missing) on a single connection
/// in WAL mode with foreign keys enforced.
pub async fn connect(config: &StoreConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|source| StoreError::Init {
            path: config.path.display().to_string(),
            source,
        })
}

struct Migration {
    name: &'static str,
    up_sql: &'static str,
}

const MIGRATION_2024_03_02_181500_0000_SETUP_TABLES: &str =
    include_str!("../../../migrations/2024-03-02-181500-0000_setup_tables/up.sql");

const MIGRATIONS: &[Migration] = &[Migration {
    name: "2024-03-02-181500-0000_setup_tables",
    up_sql: MIGRATION_2024_03_02_181500_0000_SETUP_TABLES,
}];

async fn init_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER NOT NULL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER))
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn is_migration_applied(pool: &SqlitePool, migration_name: &str) -> Result<bool> {
    let result =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _migrations WHERE name = ?1")
            .bind(migration_name)
            .fetch_one(pool)
            .await?;
    Ok(result > 0)
}

fn parse_sql_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Run every pending migration. Each migration's statements and its
/// bookkeeping row commit together.
pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    init_migrations_table(pool).await?;

    for migration in MIGRATIONS {
        if is_migration_applied(pool, migration.name).await? {
            debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        let mut tx = pool.begin().await?;

        for statement in parse_sql_statements(migration.up_sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| StoreError::Migration {
                    name: migration.name,
                    statement: statement.clone(),
                    source,
                })?;
        }

        sqlx::query("INSERT INTO _migrations (name) VALUES (?1)")
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}
