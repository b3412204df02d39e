//! Error types for identity store operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Record rejected by the store's validation rules
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// Another record already holds the same unique value
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure (connection, query, ...)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(format!("Database error: {}", err)),
        }
    }
}
