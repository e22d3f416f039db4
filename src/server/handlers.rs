//! HTTP handlers.

use super::error::ApiError;
use super::AppState;
use crate::analyze::AnalyzeRequest;
use crate::config::AnalysisMode;
use crate::error::{AnalyzeError, Stage, StageError, StorageError};
use crate::storage::{upload_path, MAX_UPLOAD_BYTES};
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_path: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub message: String,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub mode: AnalysisMode,
    pub model: String,
    pub local_fallback: bool,
    pub bucket_exists: bool,
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = payload
        .map_err(|rej| AnalyzeError::InvalidRequest(rej.body_text()).at(Stage::Received))?;

    let outcome = state.analyzer.analyze(&request).await?;

    let body = serde_json::to_value(&outcome).map_err(|e| {
        AnalyzeError::Internal(format!("Failed to serialise results: {e}")).at(Stage::Responding)
    })?;
    Ok(Json(body))
}

/// A body cut off by the request limit is a 413, any other framing error a 400.
fn multipart_error(err: MultipartError) -> StageError {
    let error: AnalyzeError = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StorageError::UploadTooLarge {
            limit: MAX_UPLOAD_BYTES,
        }
        .into()
    } else {
        AnalyzeError::InvalidUpload(err.body_text())
    };
    error.at(Stage::Received)
}

/// `POST /upload` with a multipart `file` field holding a PDF.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let rejected = |msg: String| AnalyzeError::InvalidUpload(msg).at(Stage::Received);

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| rejected("the file has no name".to_string()))?;
        let content_type = field.content_type().unwrap_or_default().to_string();
        if content_type != PDF_CONTENT_TYPE {
            return Err(rejected(format!(
                "only PDF files are accepted (got '{content_type}')"
            ))
            .into());
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(rejected("the file is empty".to_string()).into());
        }

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = upload_path(&file_name, millis);
        let stored = state
            .analyzer
            .storage()
            .upload(&path, bytes.to_vec(), PDF_CONTENT_TYPE)
            .await
            .map_err(|e| AnalyzeError::from(e).at(Stage::Received))?;

        info!("Uploaded '{}' to {}", file_name, stored);
        return Ok(Json(UploadResponse {
            success: true,
            file_path: stored,
            file_name,
        }));
    }

    Err(AnalyzeError::MissingFields {
        fields: vec!["file"],
    }
    .at(Stage::Received)
    .into())
}

/// `GET` or `POST /init`: make sure the storage bucket exists.
pub async fn init(State(state): State<AppState>) -> Result<Json<InitResponse>, ApiError> {
    let created = state
        .analyzer
        .storage()
        .ensure_bucket()
        .await
        .map_err(|e| AnalyzeError::from(e).at(Stage::Received))?;

    let message = if created {
        "Storage bucket created successfully"
    } else {
        "Storage bucket already exists"
    };
    Ok(Json(InitResponse {
        message: message.to_string(),
        created,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let analyzer = &state.analyzer;
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mode: analyzer.config().mode,
        model: analyzer.model().to_string(),
        local_fallback: analyzer.config().use_local_fallback,
        bucket_exists: analyzer.storage().bucket_exists().await,
    })
}
