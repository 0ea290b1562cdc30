//! OAuth2 access tokens for a Google service account
//!
//! A short-lived RS256 assertion signed with the service account key is
//! exchanged at the token endpoint for a bearer token, which is cached until
//! shortly before it expires.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{
    credentials::ServiceAccountCredentials,
    error::{StoreError, StoreResult},
};

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Claims of the signed assertion sent to the token endpoint
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Issues and caches bearer tokens for the Firestore REST API
pub struct TokenProvider {
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Create a provider, failing early if the private key is not valid PEM
    pub fn new(credentials: &ServiceAccountCredentials, http: reqwest::Client) -> StoreResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("Invalid service account private key: {}", e)))?;

        Ok(Self {
            client_email: credentials.client_email.clone(),
            token_uri: credentials.token_uri.clone(),
            key_id: credentials.private_key_id.clone(),
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Return a valid access token, fetching a new one when needed
    pub async fn access_token(&self) -> StoreResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let response = self.fetch_token().await?;
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!("Obtained Firestore access token valid for {}s", response.expires_in);

        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    fn sign_assertion(&self) -> StoreResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Auth(format!("System clock error: {}", e)))?
            .as_secs();

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| StoreError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch_token(&self) -> StoreResult<TokenResponse> {
        let assertion = self.sign_assertion()?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Token endpoint rejected service account assertion: {} {}", status, body);
            return Err(StoreError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI};

    #[test]
    fn test_rejects_invalid_private_key() {
        let credentials = ServiceAccountCredentials {
            account_type: "service_account".to_string(),
            project_id: "media-project".to_string(),
            private_key_id: None,
            private_key: "not a pem".to_string(),
            client_email: "svc@media-project.iam.gserviceaccount.com".to_string(),
            client_id: None,
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            auth_provider_x509_cert_url: None,
            client_x509_cert_url: None,
        };

        let result = TokenProvider::new(&credentials, reqwest::Client::new());
        assert!(matches!(result, Err(StoreError::Auth(_))));
    }
}
