//! Bearer tokens issued to workers after a successful handshake.

use crate::error::{AuthError, AuthResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a worker's bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer, fixed per deployment.
    pub iss: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Worker id this token authenticates.
    pub subject: String,
}

impl Claims {
    fn new(worker_id: &str, issuer: &str, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
            subject: worker_id.to_string(),
        }
    }
}

/// Issues and validates the HS256 bearer tokens workers use on every
/// subsequent request after the RSA-PSS handshake.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    token_validity: Duration,
}

impl JwtManager {
    pub fn new(secret: &[u8], issuer: impl Into<String>, token_validity: Duration) -> AuthResult<Self> {
        if secret.len() < 32 {
            return Err(AuthError::ConfigurationError(
                "JWT secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            token_validity,
        })
    }

    pub fn generate_access_token(&self, worker_id: &str) -> AuthResult<String> {
        let claims = Claims::new(worker_id, &self.issuer, self.token_validity);
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validates signature, issuer and expiry, returning the claims.
    ///
    /// Expiry is reported as [`AuthError::TokenExpired`] so callers can map
    /// it to a distinct response from other malformed-token failures.
    pub fn validate(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["iss", "iat", "exp", "subject"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(
            b"test_secret_key_must_be_at_least_32_bytes_long!!!",
            "mirrorqa",
            Duration::hours(1),
        )
        .unwrap()
    }

    #[test]
    fn generates_and_validates_a_token() {
        let mgr = manager();
        let token = mgr.generate_access_token("worker-1").unwrap();
        let claims = mgr.validate(&token).unwrap();
        assert_eq!(claims.subject, "worker-1");
        assert_eq!(claims.iss, "mirrorqa");
    }

    #[test]
    fn rejects_an_expired_token() {
        let mgr = JwtManager::new(
            b"test_secret_key_must_be_at_least_32_bytes_long!!!",
            "mirrorqa",
            Duration::seconds(-1),
        )
        .unwrap();
        let token = mgr.generate_access_token("worker-1").unwrap();
        assert!(matches!(mgr.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let mgr_a = manager();
        let mgr_b = JwtManager::new(
            b"another_secret_key_must_be_at_least_32_bytes!!",
            "mirrorqa",
            Duration::hours(1),
        )
        .unwrap();
        let token = mgr_a.generate_access_token("worker-1").unwrap();
        assert!(mgr_b.validate(&token).is_err());
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(JwtManager::new(b"too-short", "mirrorqa", Duration::hours(1)).is_err());
    }
}
