use thiserror::Error;

/// Errors surfaced by the storage gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update or delete keyed by id affected zero rows, or a referenced
    /// row is absent.
    #[error("no matching row")]
    NotFound,

    /// A unique, check, foreign-key or not-null constraint rejected the
    /// statement.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// The store could not be reached or failed outside the caller's control.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    StoreError::ConstraintViolation(db.message().to_string())
                }
                _ => StoreError::Unavailable(sqlx::Error::Database(db)),
            },
            other => StoreError::Unavailable(other),
        }
    }
}

/// Result type for storage gateway operations.
pub type Result<T> = std::result::Result<T, StoreError>;
