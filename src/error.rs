use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No schema registered for collection '{name}'")]
    SchemaNotFound { name: String },

    #[error("Unsupported SQL statement: {reason} - {statement}")]
    UnparseableStatement { statement: String, reason: String },

    #[error("No parameters provided for INSERT statement: {statement}")]
    MissingParameters { statement: String },

    #[error("Connection to document store failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Validation failed for '{collection}': {message}")]
    Validation { collection: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        StoreError::Internal(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::Internal(format!("Pool error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Internal(format!("Serialization error: {}", err))
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
