//! Want lists service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WantListsServiceError {
    #[error("want list not found")]
    NotFound,

    #[error("want list is no longer active")]
    NotActive,

    #[error("caller has no products in this want list")]
    Forbidden,

    #[error("conflicting concurrent update, safe to retry")]
    Conflict,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for WantListsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
