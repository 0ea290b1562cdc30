//! Firestore backend over the REST v1 API
//!
//! Authenticates as a service account and talks to
//! `projects/<project>/databases/(default)/documents`. The API root can be
//! overridden to point at the Firestore emulator.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::{DocumentPath, DocumentStore, Fields};
use crate::{
    credentials::ServiceAccountCredentials,
    error::{StoreError, StoreResult},
};

pub mod auth;
pub mod value;

use auth::TokenProvider;

/// Public Firestore REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Document resource as returned by the REST API
#[derive(Debug, Deserialize)]
struct DocumentResource {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Document store backed by Cloud Firestore
pub struct FirestoreStore {
    http: reqwest::Client,
    tokens: TokenProvider,
    documents_root: String,
}

impl FirestoreStore {
    /// Create a store for the credentials' project
    ///
    /// `base_url` is normally [`DEFAULT_BASE_URL`]; an emulator root works too.
    pub fn with_base_url(credentials: &ServiceAccountCredentials, base_url: &str) -> StoreResult<Self> {
        let http = reqwest::Client::new();
        let tokens = TokenProvider::new(credentials, http.clone())?;
        let documents_root = documents_root(base_url, &credentials.project_id);

        info!("Firestore store initialized for {}", documents_root);

        Ok(Self {
            http,
            tokens,
            documents_root,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.documents_root, path.trim_matches('/'))
    }

    async fn authorized(&self, request: RequestBuilder) -> StoreResult<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token))
    }
}

fn documents_root(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/projects/{}/databases/(default)/documents",
        base_url.trim_end_matches('/'),
        project_id
    )
}

/// Extract the document id from a full resource name
fn document_id(name: &str) -> StoreResult<&str> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::Malformed(format!("document name without id: {}", name)))
}

async fn ensure_success(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentPath> {
        let request = self
            .http
            .post(self.url(collection))
            .json(&json!({ "fields": value::encode_fields(&fields) }));

        let response = self.authorized(request).await?.send().await?;
        let document: DocumentResource = ensure_success(response).await?.json().await?;

        Ok(DocumentPath::new(collection, document_id(&document.name)?))
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let request = self
            .http
            .patch(self.url(&path.to_string()))
            .query(&query)
            .json(&json!({ "fields": value::encode_fields(&fields) }));

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }

        ensure_success(response).await?;
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>> {
        let request = self.http.get(self.url(&path.to_string()));

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: DocumentResource = ensure_success(response).await?.json().await?;
        Ok(Some(value::decode_fields(&document.fields)?))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        match self.tokens.access_token().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Firestore health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_root() {
        assert_eq!(
            documents_root("http://localhost:8080/v1/", "demo"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
    }

    #[test]
    fn test_document_id_from_resource_name() {
        let name = "projects/demo/databases/(default)/documents/artifacts/app/public/data/media/Xy12";
        assert_eq!(document_id(name).unwrap(), "Xy12");
        assert!(matches!(
            document_id("projects/demo/databases/(default)/documents/media/"),
            Err(StoreError::Malformed(_))
        ));
    }
}
