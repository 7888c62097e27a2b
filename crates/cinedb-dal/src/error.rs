pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Conflicting record: {0}")]
    Conflict(String),
}

impl Error {
    /// Maps unique constraint violations to [`Error::Conflict`].
    pub(crate) fn unique_as_conflict(error: sqlx::Error, what: impl Into<String>) -> Self {
        match error.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => Error::Conflict(what.into()),
            _ => Error::DatabaseError(error),
        }
    }

    /// Failure of the database connection or a temporary lock, worth trying again.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::DatabaseError(e) => match e {
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::WorkerCrashed
                | sqlx::Error::Tls(_) => true,
                sqlx::Error::Database(db_error) => {
                    // SQLITE_BUSY and SQLITE_LOCKED, including extended codes
                    db_error
                        .code()
                        .and_then(|code| code.parse::<i32>().ok())
                        .map(|code| matches!(code & 0xff, 5 | 6))
                        .unwrap_or(false)
                }
                _ => false,
            },
            Error::MigrationError(_) | Error::RecordNotFound(_) | Error::Conflict(_) => false,
        }
    }
}
