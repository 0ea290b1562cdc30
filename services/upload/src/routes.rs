//! Upload service routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{ApiError, ApiResult},
    models::{UploadResponse, media::UploadMediaRequest},
    state::AppState,
};

/// Create the router for the upload service
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/api/upload-media", post(upload_media))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Liveness probe
pub async fn liveness() -> &'static str {
    "Media upload service is running"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if store_ok { "ok" } else { "degraded" },
            "service": "upload-service",
            "pendingTasks": state.scheduler.pending(),
        })),
    )
}

/// Accept a media upload notification
pub async fn upload_media(
    State(state): State<AppState>,
    payload: Result<Json<UploadMediaRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let accepted = state.upload_service.submit(payload).await?;
    tracing::debug!("Upload stored at {}", accepted.path);

    let message = if accepted.task.is_some() {
        "Media uploaded, processing started"
    } else {
        "Media uploaded successfully"
    };

    Ok(Json(UploadResponse {
        message: message.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, StoreBackend},
        middleware::cors_layer,
        models::media::{MediaRecord, ProcessingStatus},
        repositories::media::media_collection,
        scheduler::{RetryPolicy, TaskScheduler},
        testing::FlakyStore,
    };
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use common::store::{DocumentStore, MemoryStore};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use tokio::time::{Instant, sleep};
    use tower::ServiceExt;

    const APP_ID: &str = "test-app";

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            app_id: APP_ID.to_string(),
            processing_delay: Duration::from_secs(5),
            shutdown_grace: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            cors_allowed_origin: None,
            store: StoreBackend::Memory,
        }
    }

    fn app_with(store: Arc<dyn DocumentStore>) -> Router {
        let state = AppState::new(store, TaskScheduler::new(RetryPolicy::default()), &test_config());
        create_router(state, cors_layer(None).unwrap())
    }

    async fn post_upload(app: &Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/upload-media")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn stored_records(store: &MemoryStore) -> Vec<MediaRecord> {
        store
            .documents_in(&media_collection(APP_ID))
            .await
            .into_iter()
            .map(|(_, fields)| serde_json::from_value(Value::Object(fields)).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_image_upload_is_complete() {
        let store = MemoryStore::new();
        let app = app_with(Arc::new(store.clone()));

        let (status, body) = post_upload(&app, r#"{"userId": "u1", "type": "image"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert!(body.get("id").is_none(), "document id must not leak");

        let records = stored_records(&store).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "u1");
        assert!(records[0].processed);
        assert_eq!(records[0].processing_status, ProcessingStatus::Complete);
    }

    #[tokio::test]
    async fn test_video_with_length_none_is_complete() {
        let store = MemoryStore::new();
        let app = app_with(Arc::new(store.clone()));

        let (status, _) = post_upload(
            &app,
            r#"{"userId": "u1", "type": "video", "videoLength": "none"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let records = stored_records(&store).await;
        assert_eq!(records.len(), 1);
        assert!(records[0].processed);
        assert_eq!(records[0].processing_status, ProcessingStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_with_length_completes_later() {
        let store = MemoryStore::new();
        let app = app_with(Arc::new(store.clone()));
        let start = Instant::now();

        let (status, _) = post_upload(
            &app,
            r#"{"userId": "u1", "type": "video", "videoLength": "10s"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(start.elapsed() < Duration::from_secs(5));

        let records = stored_records(&store).await;
        assert_eq!(records.len(), 1);
        let initial = records[0].clone();
        assert!(!initial.processed);
        assert_eq!(
            initial.processing_status,
            ProcessingStatus::Processing("10s".to_string())
        );

        sleep(Duration::from_secs(6)).await;

        let records = stored_records(&store).await;
        assert_eq!(records.len(), 1, "completion must update, not create");
        let mut expected = initial;
        expected.complete();
        assert_eq!(records[0], expected);
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let store = MemoryStore::new();
        let app = app_with(Arc::new(store.clone()));

        for body in [
            r#"{"type": "image"}"#,
            r#"{"userId": "u1"}"#,
            r#"{"userId": "", "type": "image"}"#,
            r#"{}"#,
        ] {
            let (status, response) = post_upload(&app, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            assert!(response["error"].is_string());
        }

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let store = MemoryStore::new();
        let app = app_with(Arc::new(store.clone()));

        let (status, response) = post_upload(&app, r#"{"userId": "u1", "type": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_storage_failure_returns_server_error() {
        let app = app_with(Arc::new(FlakyStore::failing_creates()));

        let (status, response) = post_upload(&app, r#"{"userId": "u1", "type": "image"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["error"], "Failed to process media upload");
    }

    #[tokio::test]
    async fn test_liveness_and_health() {
        let app = app_with(Arc::new(MemoryStore::new()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Media upload service is running");

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["pendingTasks"], 0);
    }

    #[tokio::test]
    async fn test_health_reports_degraded_store() {
        let app = app_with(Arc::new(FlakyStore::failing_creates()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
