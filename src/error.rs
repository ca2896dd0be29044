use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::RepositoryError;

/// AppError
///
/// The request-boundary error taxonomy. Every handler returns `Result<_, AppError>`;
/// the `IntoResponse` impl maps each variant to a status code and a `{ "error": ... }`
/// body. Infrastructure failures are logged with a fresh correlation id that is also
/// returned to the caller, so the body never leaks internals.
#[derive(Debug, Error)]
pub enum AppError {
    /// The id is absent, or filtered out by the active/ownership predicate.
    #[error("{0}")]
    NotFound(String),

    /// Authenticated, but the role or ownership rules deny the operation.
    #[error("you are not allowed to perform this operation")]
    Forbidden,

    /// No credential, or an expired, revoked or malformed one.
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    /// Delete rejected because articles still reference the record.
    #[error("{0}")]
    ConflictOnDelete(String),

    /// Login failure. Deliberately identical for unknown users and wrong passwords.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("internal failure: {0}")]
    Internal(#[source] RepositoryError),

    #[error("credential signing failure: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failure: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failure: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(_) => {
                AppError::Validation("username or email already exists".to_string())
            }
            RepositoryError::ForeignKeyViolation(detail) => {
                AppError::Validation(format!("referenced record does not exist: {detail}"))
            }
            other => AppError::Internal(other),
        }
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ConflictOnDelete(_) => StatusCode::CONFLICT,
            AppError::Internal(_)
            | AppError::Token(_)
            | AppError::Hashing(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            let correlation_id = Uuid::new_v4();
            tracing::error!(%correlation_id, error = %self, "request failed");
            serde_json::json!({
                "error": "an unexpected error occurred",
                "correlationId": correlation_id,
            })
        } else {
            serde_json::json!({ "error": self.to_string() })
        };
        (status, Json(body)).into_response()
    }
}
