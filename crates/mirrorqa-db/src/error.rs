//! Database error types for the mirrors-qa registry store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Empty input")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("Database error: {0}")]
    Generic(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DbError::PoolError(_) | DbError::Timeout | DbError::SqlError(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::SqlError(err) => err.as_database_error().is_none(),
            DbError::PoolError(_) | DbError::Timeout => true,
            _ => false,
        }
    }
}

impl From<DbError> for mirrorqa_core::DomainError {
    fn from(err: DbError) -> Self {
        use mirrorqa_core::DomainError;
        match err {
            DbError::NotFound(msg) => DomainError::NotFound(msg),
            DbError::DuplicateKey(msg) => DomainError::DuplicateKey(msg),
            DbError::EmptyInput => DomainError::EmptyInput,
            DbError::ValidationError(msg) => DomainError::Validation(msg),
            other => DomainError::StorageConsistency(other.to_string()),
        }
    }
}
