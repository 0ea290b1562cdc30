//! In-memory document store, used for local runs and tests

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentPath, DocumentStore, Fields};
use crate::error::{StoreError, StoreResult};

/// Document store backed by a process-local map
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<DocumentPath, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all collections
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Snapshot of every document in a collection
    pub async fn documents_in(&self, collection: &str) -> Vec<(DocumentPath, Fields)> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|(path, _)| path.collection() == collection)
            .map(|(path, fields)| (path.clone(), fields.clone()))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentPath> {
        let path = DocumentPath::new(collection, Uuid::new_v4().simple().to_string());
        self.documents.write().await.insert(path.clone(), fields);
        Ok(path)
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        document.extend(fields);
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>> {
        Ok(self.documents.read().await.get(path).cloned())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}
