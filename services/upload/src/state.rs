//! Application state shared across handlers

use std::sync::Arc;

use common::store::DocumentStore;

use crate::{
    config::AppConfig, repositories::MediaRepository, scheduler::TaskScheduler,
    service::UploadService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub scheduler: TaskScheduler,
    pub upload_service: UploadService,
}

impl AppState {
    /// Wire the upload service onto a store and scheduler
    pub fn new(store: Arc<dyn DocumentStore>, scheduler: TaskScheduler, config: &AppConfig) -> Self {
        let media_repository = MediaRepository::new(store.clone(), &config.app_id);
        let upload_service =
            UploadService::new(media_repository, scheduler.clone(), config.processing_delay);

        Self {
            store,
            scheduler,
            upload_service,
        }
    }
}
