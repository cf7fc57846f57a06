use thiserror::Error as ThisError;

/// Errors surfaced by the workout store.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum StoreError {
    /// The database file could not be opened or prepared.
    #[error("failed to open database at {path}: {source}")]
    Init {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to execute migration statement in {name}: {statement} - error: {source}")]
    Migration {
        name: &'static str,
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// True when an insert referenced a row that does not exist.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(e)) => {
                e.is_foreign_key_violation()
                    || e.message().contains("FOREIGN KEY constraint failed")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
