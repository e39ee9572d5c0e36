//! Bearer token extraction for protected routes.
//!
//! Validates the token, then resolves its `subject` claim to an existing
//! Worker (§4.3) — a syntactically valid token for a deleted worker is
//! still an authentication failure.

use crate::error::ServerError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::header::AUTHORIZATION,
    http::request::Parts,
};
use mirrorqa_core::models::Worker;

/// The worker identified by a validated bearer token.
pub struct AuthenticatedWorker(pub Worker);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedWorker
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ServerError::Unauthorized("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServerError::Unauthorized("Missing authorization header".to_string()))?;

        let claims = app_state.jwt.validate(token)?;

        let worker = app_state
            .registry
            .get_worker(&claims.subject)
            .await?
            .ok_or_else(|| ServerError::Unauthorized("unknown worker".to_string()))?;

        Ok(AuthenticatedWorker(worker))
    }
}

/// Guards that the authenticated worker id equals `expected`, as required by
/// `PATCH /tests/{id}` and the worker-countries routes.
pub fn require_ownership(actual: &str, expected: &str) -> Result<(), ServerError> {
    if actual != expected {
        return Err(ServerError::Unauthorized(
            "Insufficient privileges".to_string(),
        ));
    }
    Ok(())
}
