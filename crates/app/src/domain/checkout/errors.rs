//! Checkout service errors.

use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    #[error("want list not found")]
    NotFound,

    #[error("want list is no longer active")]
    NotActive,

    #[error("nothing to complete")]
    NothingToComplete,

    #[error("buyer is not first in queue for every item")]
    NotFirstInQueue,

    #[error("caller has no products in this want list")]
    Forbidden,

    #[error("conflicting concurrent update, safe to retry")]
    Conflict,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CheckoutServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        Self::Sql(error)
    }
}
