//! HTTP error envelope.

use crate::error::{AnalyzeError, Stage, StageError, StorageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// A failed request, rendered as `{ error, details?, stage, code }`.
#[derive(Debug)]
pub struct ApiError(pub StageError);

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        ApiError(err)
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub stage: Stage,
    pub code: &'static str,
}

/// HTTP status for an analysis error.
pub fn status_for(err: &AnalyzeError) -> StatusCode {
    match err {
        AnalyzeError::MissingFields { .. }
        | AnalyzeError::InvalidRequest(_)
        | AnalyzeError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
        AnalyzeError::Storage(StorageError::NotFound { .. })
        | AnalyzeError::Storage(StorageError::InvalidPath { .. }) => StatusCode::BAD_REQUEST,
        AnalyzeError::Storage(StorageError::TooLarge { .. })
        | AnalyzeError::Storage(StorageError::UploadTooLarge { .. }) => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        AnalyzeError::Storage(StorageError::Io { .. })
        | AnalyzeError::ProviderNotConfigured { .. }
        | AnalyzeError::InvalidConfig(_)
        | AnalyzeError::Network { .. }
        | AnalyzeError::Provider { .. }
        | AnalyzeError::AnalysisFormat { .. }
        | AnalyzeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn summary_for(stage: Stage) -> &'static str {
    match stage {
        Stage::Received => "Failed to process request",
        Stage::Extracting => "Failed to read report",
        Stage::Analyzing => "Failed to analyze report",
        Stage::Responding => "Failed to send analysis results",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let StageError { stage, error: err } = self.0;
        let status = status_for(&err);

        // Client errors carry their own message; server errors get a
        // stage summary with the cause in `details`.
        let body = if status.is_client_error() {
            ErrorBody {
                error: err.to_string(),
                details: None,
                stage,
                code: err.code(),
            }
        } else {
            error!("Request failed at stage {} ({}): {:?}", stage, status, err);
            ErrorBody {
                error: summary_for(stage).to_string(),
                details: Some(err.to_string()),
                stage,
                code: err.code(),
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_statuses() {
        let not_found = AnalyzeError::Storage(StorageError::NotFound { path: "x".into() });
        assert_eq!(status_for(&not_found), StatusCode::BAD_REQUEST);

        let too_large = AnalyzeError::Storage(StorageError::TooLarge { size: 2, limit: 1 });
        assert_eq!(status_for(&too_large), StatusCode::PAYLOAD_TOO_LARGE);

        let cut_off = AnalyzeError::Storage(StorageError::UploadTooLarge { limit: 1 });
        assert_eq!(status_for(&cut_off), StatusCode::PAYLOAD_TOO_LARGE);

        let io = AnalyzeError::Storage(StorageError::Io {
            path: "x".into(),
            source: std::io::Error::other("disk"),
        });
        assert_eq!(status_for(&io), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn provider_failure_is_server_error() {
        let err = AnalyzeError::Provider {
            status: 503,
            message: "over capacity".into(),
            body: String::new(),
        };
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for(&AnalyzeError::AnalysisFormat {
                expected: 10,
                found: 3
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
