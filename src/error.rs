use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::Role, password::PasswordError, repository::RepositoryError, token::TokenError,
    validation::FieldErrors,
};

/// ApiError
///
/// Every failure a handler can produce. Services return these as values and the
/// `IntoResponse` impl turns them into `{status, {message[, errors]}}`, so nothing
/// past the handler layer needs to interpret a failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed payload. Carries the per-field message map.
    #[error("invalid data")]
    Validation(FieldErrors),

    /// Unknown email in both stores, or a password mismatch. Deliberately identical.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token not provided")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    /// Valid identity, insufficient role.
    #[error("access denied: {}", .0.plural())]
    Forbidden(Role),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("route not found")]
    RouteNotFound,

    /// Store, hashing or signing fault. The detail is logged, never sent.
    #[error("internal server error")]
    Internal(String),
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidCredentials
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let errors = match self {
            ApiError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        ErrorBody {
            message: self.to_string(),
            errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(%detail, "request failed with an internal fault");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(field) => {
                ApiError::Conflict(format!("{field} already registered"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => ApiError::InvalidToken,
            TokenError::Signing(detail) => ApiError::Internal(detail),
        }
    }
}
