//! Media models for the upload service

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Placeholder stored in `url`; no asset is ever uploaded
pub const PLACEHOLDER_URL: &str = "https://via.placeholder.com/150";

/// `videoLength` value that opts out of simulated processing
const NO_VIDEO_LENGTH: &str = "none";

/// Kind of media being announced
///
/// Only `video` is special-cased; any other tag is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Image,
    Video,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for MediaType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            _ => MediaType::Other(tag),
        }
    }
}

impl From<MediaType> for String {
    fn from(media_type: MediaType) -> Self {
        media_type.as_str().to_string()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated processing state of a media record
///
/// Transitions only move forward: `queued` -> `processing for <length>` ->
/// `complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProcessingStatus {
    Queued,
    Processing(String),
    Complete,
}

impl ProcessingStatus {
    const PROCESSING_PREFIX: &'static str = "processing for ";
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Queued => f.write_str("queued"),
            ProcessingStatus::Processing(length) => {
                write!(f, "{}{}", Self::PROCESSING_PREFIX, length)
            }
            ProcessingStatus::Complete => f.write_str("complete"),
        }
    }
}

impl TryFrom<String> for ProcessingStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "queued" => Ok(ProcessingStatus::Queued),
            "complete" => Ok(ProcessingStatus::Complete),
            other => other
                .strip_prefix(Self::PROCESSING_PREFIX)
                .map(|length| ProcessingStatus::Processing(length.to_string()))
                .ok_or_else(|| format!("unknown processing status {:?}", other)),
        }
    }
}

impl From<ProcessingStatus> for String {
    fn from(status: ProcessingStatus) -> Self {
        status.to_string()
    }
}

/// Media record as stored in the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    /// Local creation date, advisory only
    pub date: String,
    pub processed: bool,
    pub processing_status: ProcessingStatus,
}

impl MediaRecord {
    /// Build a freshly queued record dated today
    pub fn new(user_id: String, media_type: MediaType) -> Self {
        Self {
            user_id,
            media_type,
            url: PLACEHOLDER_URL.to_string(),
            date: Local::now().format("%-m/%-d/%Y").to_string(),
            processed: false,
            processing_status: ProcessingStatus::Queued,
        }
    }

    /// Move the record into simulated processing
    pub fn start_processing(&mut self, video_length: &str) {
        self.processed = false;
        self.processing_status = ProcessingStatus::Processing(video_length.to_string());
    }

    /// Move the record into its terminal state
    pub fn complete(&mut self) {
        self.processed = true;
        self.processing_status = ProcessingStatus::Complete;
    }
}

/// Request body for `POST /api/upload-media`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaRequest {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub video_length: Option<String>,
}

/// Upload request whose required fields are known to be present
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub user_id: String,
    pub media_type: MediaType,
    pub video_length: Option<String>,
}

impl UploadMediaRequest {
    /// Check required fields; only absent or empty strings count as missing
    pub fn validate(self) -> Result<ValidatedUpload, UploadError> {
        let user_id = non_empty(self.user_id)
            .ok_or_else(|| UploadError::Validation("userId is required".to_string()))?;
        let media_type = non_empty(self.media_type)
            .ok_or_else(|| UploadError::Validation("type is required".to_string()))?;

        Ok(ValidatedUpload {
            user_id,
            media_type: MediaType::from(media_type),
            video_length: non_empty(self.video_length),
        })
    }
}

impl ValidatedUpload {
    /// Length to simulate processing for, if this upload takes the delayed path
    pub fn processing_length(&self) -> Option<&str> {
        match (&self.media_type, self.video_length.as_deref()) {
            (MediaType::Video, Some(length)) if length != NO_VIDEO_LENGTH => Some(length),
            _ => None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
