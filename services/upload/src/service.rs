//! Upload intake handling
//!
//! Validates an upload notification, writes its media record and, for
//! videos with a length, schedules the simulated processing that later
//! flips the record to `complete`.

use std::time::Duration;

use common::store::DocumentPath;
use tracing::info;

use crate::{
    error::UploadError,
    models::media::{MediaRecord, UploadMediaRequest},
    repositories::MediaRepository,
    scheduler::{TaskHandle, TaskScheduler},
};

/// Outcome of an accepted upload
///
/// Only for in-process observers; none of it is returned to the HTTP caller.
#[derive(Debug)]
pub struct Accepted {
    /// Where the record was written
    pub path: DocumentPath,
    /// Pending completion, present only on the simulated processing path
    pub task: Option<TaskHandle>,
}

/// Handles upload notifications
#[derive(Clone)]
pub struct UploadService {
    media: MediaRepository,
    scheduler: TaskScheduler,
    processing_delay: Duration,
}

impl UploadService {
    pub fn new(media: MediaRepository, scheduler: TaskScheduler, processing_delay: Duration) -> Self {
        Self {
            media,
            scheduler,
            processing_delay,
        }
    }

    /// Accept an upload notification
    ///
    /// Returns once the initial record is stored. The deferred completion of
    /// a video record is owned by the scheduler and never awaited here.
    pub async fn submit(&self, request: UploadMediaRequest) -> Result<Accepted, UploadError> {
        let upload = request.validate()?;
        let mut record = MediaRecord::new(upload.user_id.clone(), upload.media_type.clone());

        let Some(length) = upload.processing_length() else {
            record.complete();
            let path = self.media.create(&record).await?;
            info!(
                user_id = %upload.user_id,
                media_type = %upload.media_type,
                "Stored completed media record {}",
                path
            );
            return Ok(Accepted { path, task: None });
        };

        record.start_processing(length);
        let path = self.media.create(&record).await?;
        let task = self.schedule_completion(path.clone());

        info!(
            user_id = %upload.user_id,
            task_id = %task.id(),
            "Stored media record {} as {}, completing in {:?}",
            path,
            record.processing_status,
            self.processing_delay
        );

        Ok(Accepted {
            path,
            task: Some(task),
        })
    }

    fn schedule_completion(&self, path: DocumentPath) -> TaskHandle {
        let media = self.media.clone();
        let name = format!("complete {}", path);

        self.scheduler.submit(name, self.processing_delay, move || {
            let media = media.clone();
            let path = path.clone();
            async move { media.mark_complete(&path).await.map_err(anyhow::Error::from) }
        })
    }
}
