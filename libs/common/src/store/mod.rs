//! Document store abstraction
//!
//! Documents are flat JSON objects addressed by a hierarchical collection
//! path plus a store-assigned id. Three backends implement [`DocumentStore`]:
//! Firestore over its REST API, PostgreSQL JSONB rows, and an in-memory map.

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreResult;

pub mod firestore;
pub mod memory;
pub mod postgres;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Top-level fields of a document
pub type Fields = Map<String, Value>;

/// Full address of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Collection path, e.g. `artifacts/app/public/data/media`
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store-assigned document id
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Persistence operations shared by every backend
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document in `collection` and return its store-assigned path
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentPath>;

    /// Overwrite only the given top-level fields of an existing document
    ///
    /// Fails with [`StoreError::NotFound`](crate::error::StoreError::NotFound)
    /// when the document does not exist.
    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()>;

    /// Fetch a document, `None` if it does not exist
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> StoreResult<bool>;
}
