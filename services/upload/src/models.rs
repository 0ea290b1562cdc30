//! API models for request and response payloads

use serde::Serialize;

pub mod media;

/// Body returned when an upload notification is accepted
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
}
