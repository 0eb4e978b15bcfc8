//! Document store errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("document already exists")]
    AlreadyExists,

    #[error("batch of {size} operations exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("document is not a JSON object")]
    InvalidDocument,

    /// Transient backend failure; callers decide whether to retry.
    #[error("document store unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary backend failure as [`StoreError::Unavailable`].
    pub fn unavailable(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Box::new(error))
    }
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::CheckViolation) => Self::InvalidDocument,
            Some(ErrorKind::Other | _) | None => Self::unavailable(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            StoreError::from(Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }
}
