//! Test doubles shared by the unit tests

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use async_trait::async_trait;
use common::{
    error::{StoreError, StoreResult},
    store::{DocumentPath, DocumentStore, Fields, MemoryStore},
};

/// Memory store that can be told to fail writes
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_creates: Arc<AtomicBool>,
    update_failures_left: Arc<AtomicU32>,
}

impl FlakyStore {
    /// Every `create` fails
    pub fn failing_creates() -> Self {
        let store = Self::default();
        store.fail_creates.store(true, Ordering::SeqCst);
        store
    }

    /// The next `count` calls to `update` fail
    pub fn failing_updates(count: u32) -> Self {
        let store = Self::default();
        store.update_failures_left.store(count, Ordering::SeqCst);
        store
    }

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            body: "store unavailable".to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentPath> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.create(collection, fields).await
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let should_fail = self
            .update_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(Self::unavailable());
        }
        self.inner.update(path, fields).await
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>> {
        self.inner.get(path).await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(!self.fail_creates.load(Ordering::SeqCst))
    }
}
