//! Maps domain and auth errors onto the wire taxonomy in §7: 400 on
//! malformed input, 401 on any authentication/ownership failure, 404 on
//! unknown Test ids, 500 on everything else.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mirrorqa_core::DomainError;
use serde::Serialize;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("{}", self),
            StatusCode::UNAUTHORIZED => tracing::debug!("{}", self),
            _ => tracing::warn!("{}", self),
        }

        let mut response = (status, Json(ErrorBody { error: message })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, "Bearer".parse().unwrap());
        }
        response
    }
}

impl From<DomainError> for ServerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServerError::BadRequest(msg),
            DomainError::EmptyInput => ServerError::BadRequest("empty input".to_string()),
            DomainError::Auth(msg) => ServerError::Unauthorized(msg),
            DomainError::Ownership(msg) => ServerError::Unauthorized(msg),
            DomainError::NotFound(msg) => ServerError::NotFound(msg),
            DomainError::DuplicateKey(msg) => ServerError::BadRequest(msg),
            DomainError::UpstreamFetch(msg) => ServerError::Internal(msg),
            DomainError::StorageConsistency(msg) => ServerError::Internal(msg),
            DomainError::Internal(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<mirrorqa_db::DbError> for ServerError {
    fn from(err: mirrorqa_db::DbError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<mirrorqa_auth::AuthError> for ServerError {
    fn from(err: mirrorqa_auth::AuthError) -> Self {
        use mirrorqa_auth::AuthError;
        match err {
            AuthError::TokenExpired => ServerError::Unauthorized("Token has expired.".to_string()),
            AuthError::InvalidChallengeFormat => {
                ServerError::BadRequest("Invalid message format.".to_string())
            }
            AuthError::ChallengeExpired
            | AuthError::InvalidToken(_)
            | AuthError::InvalidSignature
            | AuthError::InvalidKey(_) => ServerError::Unauthorized(err.to_string()),
            AuthError::TokenGenerationError(msg) | AuthError::ConfigurationError(msg) => {
                ServerError::Internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found_to_404() {
        let err: ServerError = DomainError::NotFound("test".to_string()).into();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn maps_ownership_to_401() {
        let err: ServerError = DomainError::Ownership("nope".to_string()).into();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }
}
