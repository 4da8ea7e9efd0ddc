//! Products service errors.

use std::fmt::{Display, Formatter, Result as FmtResult};

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

/// The first unmet publish requirement, in checklist order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishRequirement {
    Photo,
    Category,
}

impl Display for PublishRequirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Photo => f.write_str("photo"),
            Self::Category => f.write_str("category"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProductsServiceError {
    #[error("product already exists")]
    AlreadyExists,

    #[error("product not found")]
    NotFound,

    #[error("caller does not own this product")]
    Forbidden,

    #[error("product is already published")]
    AlreadyPublished,

    #[error("product is not published")]
    NotPublished,

    #[error("product is already sold")]
    AlreadySold,

    #[error("publish requires at least one {0}")]
    PreconditionFailed(PublishRequirement),

    #[error("cannot unpublish while buyers are queued")]
    QueueNotEmpty,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for ProductsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::ForeignKeyViolation | ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}
