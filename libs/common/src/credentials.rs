//! Service account credentials for the Firestore backend
//!
//! The bundle mirrors a Google service account key file, but every field is
//! read from its own environment variable so the key never has to live on
//! disk.

use std::{env, fmt};

use crate::error::ConfigError;

/// Default OAuth2 token endpoint for Google service accounts
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default OAuth2 authorization endpoint
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google service account credential bundle
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    /// Account type, normally `service_account`
    pub account_type: String,
    pub project_id: String,
    pub private_key_id: Option<String>,
    /// PEM-encoded RSA private key
    pub private_key: String,
    pub client_email: String,
    pub client_id: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: Option<String>,
    pub client_x509_cert_url: Option<String>,
}

impl ServiceAccountCredentials {
    /// Load the credential bundle from environment variables
    ///
    /// # Environment Variables
    /// - `FIREBASE_PROJECT_ID`, `FIREBASE_PRIVATE_KEY`, `FIREBASE_CLIENT_EMAIL`: required
    /// - `FIREBASE_TYPE` (default: `service_account`)
    /// - `FIREBASE_PRIVATE_KEY_ID`, `FIREBASE_CLIENT_ID`
    /// - `FIREBASE_AUTH_URI`, `FIREBASE_TOKEN_URI` (default: Google endpoints)
    /// - `FIREBASE_AUTH_PROVIDER_X509_CERT_URL`, `FIREBASE_CLIENT_X509_CERT_URL`
    ///
    /// Escaped `\n` sequences in the private key are turned into newlines, as
    /// most secret managers flatten the PEM onto one line.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = required("FIREBASE_PROJECT_ID")?;
        let private_key = required("FIREBASE_PRIVATE_KEY")?.replace("\\n", "\n");
        let client_email = required("FIREBASE_CLIENT_EMAIL")?;

        Ok(Self {
            account_type: optional("FIREBASE_TYPE").unwrap_or_else(|| "service_account".to_string()),
            project_id,
            private_key_id: optional("FIREBASE_PRIVATE_KEY_ID"),
            private_key,
            client_email,
            client_id: optional("FIREBASE_CLIENT_ID"),
            auth_uri: optional("FIREBASE_AUTH_URI").unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: optional("FIREBASE_TOKEN_URI")
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            auth_provider_x509_cert_url: optional("FIREBASE_AUTH_PROVIDER_X509_CERT_URL"),
            client_x509_cert_url: optional("FIREBASE_CLIENT_X509_CERT_URL"),
        })
    }
}

// Keeps the private key out of logs.
impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
