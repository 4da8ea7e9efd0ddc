//! Reservations service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservationsServiceError {
    #[error("product not found")]
    ProductNotFound,

    #[error("buyer is already queued for this product")]
    AlreadyQueued,

    #[error("product is already sold")]
    ProductSold,

    #[error("caller does not own this product")]
    Forbidden,

    #[error("conflicting concurrent update, safe to retry")]
    Conflict,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ReservationsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::ProductNotFound;
        }

        // Duplicate entries are rejected before insert under the product
        // lock, so a violation that still surfaces is a lost race with a
        // concurrent writer and clears on retry.
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation) => Self::Conflict,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
