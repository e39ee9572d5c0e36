//! Typed client for the mirrors-qa backend API (C4), as consumed by C6.

use crate::error::{ManagerError, ManagerResult};
use chrono::{DateTime, Utc};
use mirrorqa_core::models::{Test, TestUpdate};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use rsa::pkcs8::EncodePublicKey;

#[derive(Debug, Clone)]
struct AuthCredentials {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ListTestsResponse {
    tests: Vec<Test>,
    metadata: PageMetadata,
}

#[derive(Debug, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    last_page: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SetCountriesRequest<'a> {
    country_codes: &'a BTreeSet<String>,
}

pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    worker_id: String,
    private_key: RsaPrivateKey,
    credentials: Option<AuthCredentials>,
}

impl BackendClient {
    pub fn new(
        base_url: String,
        worker_id: String,
        private_key: RsaPrivateKey,
        timeout: Duration,
    ) -> ManagerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ManagerError::from)?;
        Ok(Self {
            client,
            base_url,
            worker_id,
            private_key,
            credentials: None,
        })
    }

    pub fn pubkey_fingerprint(&self) -> String {
        mirrorqa_auth::handshake::fingerprint_of_private_key(&self.private_key)
    }

    /// Ensures a live bearer token is cached, re-authenticating via the
    /// RSA-PSS handshake (§4.3) when absent or close to expiry.
    async fn ensure_authenticated(&mut self) -> ManagerResult<String> {
        if let Some(creds) = &self.credentials {
            if creds.expires_at > Utc::now() {
                return Ok(creds.access_token.clone());
            }
        }

        let (message, signature) =
            mirrorqa_auth::handshake::sign_challenge(&self.private_key, &self.worker_id)?;

        let response = self
            .client
            .post(format!("{}/auth/authenticate", self.base_url))
            .header("X-SSHAuth-Message", &message)
            .header("X-SSHAuth-Signature", &signature)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ManagerError::Unauthorized);
        }
        let response = response.error_for_status()?;
        let body: AuthenticateResponse = response.json().await?;

        let expires_at = Utc::now() + chrono::Duration::seconds(body.expires_in);
        self.credentials = Some(AuthCredentials {
            access_token: body.access_token.clone(),
            expires_at,
        });
        Ok(body.access_token)
    }

    pub async fn set_countries(&mut self, countries: &BTreeSet<String>) -> ManagerResult<()> {
        let token = self.ensure_authenticated().await?;
        self.client
            .put(format!(
                "{}/workers/{}/countries",
                self.base_url, self.worker_id
            ))
            .bearer_auth(token)
            .json(&SetCountriesRequest {
                country_codes: countries,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Pages through `GET /tests?worker_id={id}&status=PENDING` until exhausted.
    pub async fn list_pending_tests(&mut self) -> ManagerResult<Vec<Test>> {
        let token = self.ensure_authenticated().await?;
        let mut tests = Vec::new();
        let mut page_num = 1u64;

        loop {
            let response: ListTestsResponse = self
                .client
                .get(format!("{}/tests", self.base_url))
                .bearer_auth(&token)
                .query(&[
                    ("worker_id", self.worker_id.as_str()),
                    ("status", "PENDING"),
                    ("page_num", &page_num.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let got = response.tests.len();
            tests.extend(response.tests);

            let last_page = response.metadata.last_page.unwrap_or(1);
            if got == 0 || page_num >= last_page {
                break;
            }
            page_num += 1;
        }

        Ok(tests)
    }

    pub async fn patch_test(&mut self, id: uuid::Uuid, update: &TestUpdate) -> ManagerResult<()> {
        let token = self.ensure_authenticated().await?;
        self.client
            .patch(format!("{}/tests/{}", self.base_url, id))
            .bearer_auth(token)
            .json(update)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Re-derives the public key PEM from the loaded private key, for logging
/// and for the rare case a worker needs to re-register itself.
pub fn public_key_pem(private_key: &RsaPrivateKey) -> ManagerResult<String> {
    let public_key = rsa::RsaPublicKey::from(private_key);
    public_key
        .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
        .map_err(|e| ManagerError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).unwrap()
    }

    #[tokio::test]
    async fn authenticates_then_reuses_the_cached_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/workers/w1/countries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "country_codes": ["fr"]
            })))
            .mount(&server)
            .await;

        let mut client = BackendClient::new(
            server.uri(),
            "w1".to_string(),
            test_key(),
            Duration::from_secs(5),
        )
        .unwrap();

        let mut countries = BTreeSet::new();
        countries.insert("fr".to_string());

        client.set_countries(&countries).await.unwrap();
        client.set_countries(&countries).await.unwrap();
    }
}
