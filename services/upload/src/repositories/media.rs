//! Media repository for document store operations

use std::sync::Arc;

use common::{
    error::{StoreError, StoreResult},
    store::{DocumentPath, DocumentStore, Fields},
};
use serde_json::Value;

use crate::models::media::{MediaRecord, ProcessingStatus};

/// Collection holding media records for an app
pub fn media_collection(app_id: &str) -> String {
    format!("artifacts/{}/public/data/media", app_id)
}

/// Media repository for document store operations
#[derive(Clone)]
pub struct MediaRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl MediaRepository {
    /// Create a new media repository scoped to an app id
    pub fn new(store: Arc<dyn DocumentStore>, app_id: &str) -> Self {
        Self {
            store,
            collection: media_collection(app_id),
        }
    }

    /// Persist a new media record and return its store-assigned path
    pub async fn create(&self, record: &MediaRecord) -> StoreResult<DocumentPath> {
        let fields = match serde_json::to_value(record)? {
            Value::Object(fields) => fields,
            other => {
                return Err(StoreError::Malformed(format!(
                    "media record serialized to non-object {}",
                    other
                )));
            }
        };

        self.store.create(&self.collection, fields).await
    }

    /// Flip a record to its terminal state, leaving every other field alone
    pub async fn mark_complete(&self, path: &DocumentPath) -> StoreResult<()> {
        let mut fields = Fields::new();
        fields.insert("processed".to_string(), Value::Bool(true));
        fields.insert(
            "processingStatus".to_string(),
            Value::String(ProcessingStatus::Complete.to_string()),
        );

        self.store.update(path, fields).await
    }

    /// Get a media record by path
    pub async fn get(&self, path: &DocumentPath) -> StoreResult<Option<MediaRecord>> {
        match self.store.get(path).await? {
            Some(fields) => Ok(Some(serde_json::from_value(Value::Object(fields))?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::MediaType;
    use common::store::MemoryStore;

    #[tokio::test]
    async fn test_mark_complete_only_touches_status_fields() {
        let store = MemoryStore::new();
        let repository = MediaRepository::new(Arc::new(store.clone()), "test-app");

        let mut record = MediaRecord::new("u1".to_string(), MediaType::Video);
        record.start_processing("10s");
        let path = repository.create(&record).await.unwrap();
        assert_eq!(path.collection(), "artifacts/test-app/public/data/media");

        repository.mark_complete(&path).await.unwrap();

        let stored = repository.get(&path).await.unwrap().unwrap();
        let mut expected = record.clone();
        expected.complete();
        assert_eq!(stored, expected);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_mark_complete_on_missing_record() {
        let repository = MediaRepository::new(Arc::new(MemoryStore::new()), "test-app");
        let missing = DocumentPath::new(media_collection("test-app"), "nope");

        let result = repository.mark_complete(&missing).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(repository.get(&missing).await.unwrap().is_none());
    }
}
