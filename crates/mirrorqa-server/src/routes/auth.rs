//! `POST /auth/authenticate` — the RSA-PSS worker handshake (§4.3).

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use chrono::Duration as ChronoDuration;
use mirrorqa_auth::handshake;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticateResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> ServerResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::BadRequest(format!("missing {name} header")))
}

/// Verifies the worker's signed challenge and mints a bearer token.
#[utoipa::path(
    post,
    path = "/auth/authenticate",
    responses(
        (status = 200, description = "Handshake succeeded", body = AuthenticateResponse),
        (status = 400, description = "Malformed message or signature"),
        (status = 401, description = "Stale challenge, unknown worker, or bad signature"),
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<AuthenticateResponse>> {
    let message = header_str(&headers, "X-SSHAuth-Message")?;
    let signature_header = header_str(&headers, "X-SSHAuth-Signature")?;

    let signature = handshake::decode_signature(signature_header)?;
    let challenge = handshake::parse_challenge(message)?;

    let validity = ChronoDuration::from_std(state.message_validity())
        .unwrap_or_else(|_| ChronoDuration::seconds(60));
    handshake::check_freshness(challenge.timestamp, validity)?;

    let worker = state
        .registry
        .get_worker(&challenge.worker_id)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("unknown worker".to_string()))?;

    handshake::verify_signature(&worker.pubkey_pem, message.as_bytes(), &signature)?;

    let access_token = state.jwt.generate_access_token(&worker.id)?;

    Ok(Json(AuthenticateResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.config.token_expiry.as_secs() as i64,
    }))
}
