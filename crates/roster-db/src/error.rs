use rusqlite::ffi;
use thiserror::Error;

/// Store-level failures. Constraint violations are translated into the
/// typed variants here so callers never inspect raw SQLite codes.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("could not generate a unique join code after {0} attempts")]
    ConflictRetryExhausted(u32),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
