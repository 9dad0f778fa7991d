use axum::http::StatusCode;
use thiserror::Error;

/// Outcome of a failed account operation, as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("missing data")]
    MissingData,
    #[error("duplicate entry")]
    DuplicateEntry,
    #[error("{0}")]
    UserBadRequest(&'static str),
    #[error("{0}")]
    Database(&'static str),
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::MissingData | AccountError::UserBadRequest(_) => StatusCode::BAD_REQUEST,
            AccountError::DuplicateEntry => StatusCode::CONFLICT,
            AccountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.message().to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}
