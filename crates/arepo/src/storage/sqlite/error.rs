//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `RepositoryError`
//! from `arepo_core::storage`. Constraint violations on `_id` become
//! `AlreadyExists`.

use arepo_core::storage::RepositoryError;

/// Wraps a rusqlite error for tokio_rusqlite closures.
pub fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// Carries a repository error out of a tokio_rusqlite closure.
///
/// [`map_tokio_rusqlite_error`] unwraps it again unchanged.
pub fn wrap_repository_err(e: RepositoryError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(e))
}

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps a rusqlite error to a RepositoryError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_UNIQUE` / `SQLITE_CONSTRAINT_PRIMARYKEY` → `RepositoryError::AlreadyExists`
/// - Connection errors → `RepositoryError::ConnectionFailed`
/// - No rows → `RepositoryError::NotFound`
/// - All other errors → `RepositoryError::QueryFailed`
fn map_rusqlite_error(err: &rusqlite::Error, id: Option<&str>) -> RepositoryError {
    match err {
        _ if is_duplicate_key(err) => RepositoryError::AlreadyExists {
            id: id.unwrap_or("unknown").to_string(),
        },

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            RepositoryError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound,

        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
            RepositoryError::Serialization(inner.to_string())
        }

        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

fn map_error(err: tokio_rusqlite::Error, id: Option<&str>) -> RepositoryError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err, id),
        tokio_rusqlite::Error::Close(_) | tokio_rusqlite::Error::ConnectionClosed => {
            RepositoryError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        tokio_rusqlite::Error::Other(inner) => match inner.downcast_ref::<RepositoryError>() {
            Some(repository_err) => repository_err.clone(),
            None => RepositoryError::QueryFailed(err.to_string()),
        },
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a RepositoryError.
///
/// This is the main entry point for error mapping in async code.
pub fn map_tokio_rusqlite_error(err: tokio_rusqlite::Error) -> RepositoryError {
    map_error(err, None)
}

/// Maps a tokio_rusqlite error with a known document ID.
pub fn map_tokio_rusqlite_error_with_id(
    err: tokio_rusqlite::Error,
    id: impl AsRef<str>,
) -> RepositoryError {
    map_error(err, Some(id.as_ref()))
}
