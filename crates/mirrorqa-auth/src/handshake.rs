//! RSA-PSS verification for the worker handshake.
//!
//! Workers prove ownership of the private key registered for their worker id
//! by signing a message of the form `worker_id:timestamp` (timestamp is an
//! ISO-8601 UTC instant) with RSA-PSS/SHA-256. The server reconstructs the
//! message, checks it is fresh, and verifies the signature against the
//! worker's stored public key.

use crate::error::{AuthError, AuthResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use signature::{RandomizedSigner, SignatureEncoding, Verifier};

/// A parsed, not-yet-verified handshake challenge.
pub struct Challenge {
    pub worker_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Decodes the `X-SSHAuth-Signature` header value.
pub fn decode_signature(encoded: &str) -> AuthResult<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|_| AuthError::InvalidChallengeFormat)
}

/// Parses the `X-SSHAuth-Message` header value: `worker_id:timestamp`.
pub fn parse_challenge(message: &str) -> AuthResult<Challenge> {
    let (worker_id, timestamp_str) = message
        .split_once(':')
        .ok_or(AuthError::InvalidChallengeFormat)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .map_err(|_| AuthError::InvalidChallengeFormat)?
        .with_timezone(&Utc);
    Ok(Challenge {
        worker_id: worker_id.to_string(),
        timestamp,
    })
}

/// Rejects a challenge whose timestamp is further in the past than
/// `validity` (a worker clock ahead of the server is accepted).
pub fn check_freshness(timestamp: DateTime<Utc>, validity: Duration) -> AuthResult<()> {
    if Utc::now() - timestamp > validity {
        return Err(AuthError::ChallengeExpired);
    }
    Ok(())
}

fn load_public_key(pubkey_pem: &str) -> AuthResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pubkey_pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pubkey_pem))
        .map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Verifies `signature` over `message` using the worker's PEM-encoded
/// public key, RSA-PSS with MGF1-SHA256 and SHA-256 digest.
pub fn verify_signature(pubkey_pem: &str, message: &[u8], signature: &[u8]) -> AuthResult<()> {
    let public_key = load_public_key(pubkey_pem)?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature = Signature::try_from(signature).map_err(|_| AuthError::InvalidSignature)?;
    verifying_key.verify(message, &signature).map_err(|_| {
        tracing::warn!("handshake signature verification failed");
        AuthError::InvalidSignature
    })
}

/// Loads an RSA private key, accepting either PKCS#8 or PKCS#1 PEM.
pub fn load_private_key(pem: &str) -> AuthResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Builds the handshake message `worker_id:now` and signs it with RSA-PSS/SHA-256.
/// Returns `(message, base64-encoded signature)`.
pub fn sign_challenge(private_key: &RsaPrivateKey, worker_id: &str) -> AuthResult<(String, String)> {
    let message = format!("{worker_id}:{}", Utc::now().to_rfc3339());
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign_with_rng(&mut OsRng, message.as_bytes());
    let encoded = BASE64.encode(signature.to_bytes());
    Ok((message, encoded))
}

/// Fingerprint of the public half of a private key, for startup log lines.
pub fn fingerprint_of_private_key(private_key: &RsaPrivateKey) -> String {
    let blob = ssh_wire_blob(&RsaPublicKey::from(private_key));
    use sha2::Digest;
    let digest = Sha256::digest(&blob);
    digest.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

/// Computes the SHA-256 fingerprint of the public key as a lowercase,
/// colon-separated hex string, matching the fingerprint format used when
/// workers are registered.
pub fn fingerprint(pubkey_pem: &str) -> AuthResult<String> {
    use sha2::{Digest, Sha256 as Sha256Digest};

    let public_key = load_public_key(pubkey_pem)?;
    let blob = ssh_wire_blob(&public_key);
    let digest = Sha256Digest::digest(&blob);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":"))
}

fn ssh_wire_blob(public_key: &RsaPublicKey) -> Vec<u8> {
    use rsa::traits::PublicKeyParts;

    let mut blob = Vec::new();
    write_ssh_string(&mut blob, b"ssh-rsa");
    write_ssh_string(&mut blob, &encode_mpint(&public_key.e().to_bytes_be()));
    write_ssh_string(&mut blob, &encode_mpint(&public_key.n().to_bytes_be()));
    blob
}

fn write_ssh_string(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

fn encode_mpint(bytes: &[u8]) -> Vec<u8> {
    let mut b = bytes;
    while b.len() > 1 && b[0] == 0 {
        b = &b[1..];
    }
    let mut out = Vec::new();
    if !b.is_empty() && b[0] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_challenge() {
        let challenge = parse_challenge("worker-1:2026-01-01T00:00:00+00:00").unwrap();
        assert_eq!(challenge.worker_id, "worker-1");
    }

    #[test]
    fn rejects_a_challenge_missing_the_separator() {
        assert!(parse_challenge("worker-1").is_err());
    }

    #[test]
    fn rejects_a_non_iso_timestamp() {
        assert!(parse_challenge("worker-1:not-a-date").is_err());
    }

    #[test]
    fn rejects_a_stale_challenge() {
        let timestamp = Utc::now() - Duration::seconds(120);
        assert!(matches!(
            check_freshness(timestamp, Duration::seconds(60)),
            Err(AuthError::ChallengeExpired)
        ));
    }

    #[test]
    fn accepts_a_fresh_challenge() {
        let timestamp = Utc::now() - Duration::seconds(5);
        assert!(check_freshness(timestamp, Duration::seconds(60)).is_ok());
    }

    #[test]
    fn rejects_signature_bytes_that_are_not_valid_base64() {
        assert!(decode_signature("not base64!!").is_err());
    }

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 2048).unwrap()
    }

    #[test]
    fn signs_and_verifies_a_round_trip() {
        let private_key = test_key();
        let public_key = RsaPublicKey::from(&private_key);
        let pubkey_pem = rsa::pkcs8::EncodePublicKey::to_public_key_pem(
            &public_key,
            rsa::pkcs8::LineEnding::LF,
        )
        .unwrap();

        let (message, signature_b64) = sign_challenge(&private_key, "worker-1").unwrap();
        let signature = decode_signature(&signature_b64).unwrap();

        assert!(verify_signature(&pubkey_pem, message.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn rejects_a_signature_over_a_tampered_message() {
        let private_key = test_key();
        let public_key = RsaPublicKey::from(&private_key);
        let pubkey_pem = rsa::pkcs8::EncodePublicKey::to_public_key_pem(
            &public_key,
            rsa::pkcs8::LineEnding::LF,
        )
        .unwrap();

        let (_, signature_b64) = sign_challenge(&private_key, "worker-1").unwrap();
        let signature = decode_signature(&signature_b64).unwrap();

        let tampered = b"worker-2:2026-01-01T00:00:00+00:00";
        assert!(verify_signature(&pubkey_pem, tampered, &signature).is_err());
    }

    #[test]
    fn fingerprint_of_private_key_matches_fingerprint_of_its_public_key() {
        let private_key = test_key();
        let public_key = RsaPublicKey::from(&private_key);
        let pubkey_pem = rsa::pkcs8::EncodePublicKey::to_public_key_pem(
            &public_key,
            rsa::pkcs8::LineEnding::LF,
        )
        .unwrap();

        assert_eq!(
            fingerprint_of_private_key(&private_key),
            fingerprint(&pubkey_pem).unwrap()
        );
    }
}
