//! Error types for the marketmetric library.
//!
//! Three types reflect three layers of failure:
//!
//! * [`StorageError`]: the storage collaborator could not read or write a
//!   report. Wrapped by [`AnalyzeError::Storage`].
//!
//! * [`AnalyzeError`]: **Fatal** for one analysis request: bad input,
//!   missing credential, the LLM call failed, or (under the strict parse
//!   policy) the model ignored the answer format.
//!
//! * [`StageError`]: an [`AnalyzeError`] tagged with the pipeline
//!   [`Stage`] it escaped from, so logs and the HTTP error envelope can tell
//!   an extraction failure apart from an analysis failure.
//!
//! PDF parse failures never appear here. The extractor substitutes the sample
//! document and reports the substitution through
//! [`crate::pipeline::extract::ExtractedText::Fallback`] instead.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object exists at the requested path.
    #[error("File not found in storage: '{path}'")]
    NotFound { path: String },

    /// The path is absolute, empty, or escapes the bucket.
    #[error("Invalid storage path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Upload exceeds the bucket's size limit.
    #[error("File is {size} bytes; the storage limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Request body hit the server's upload limit before it was read in full.
    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    /// Underlying filesystem failure.
    #[error("Storage I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All fatal errors of a single report analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    // ── Validation errors ────────────────────────────────────────────────
    /// Required request fields are absent or blank.
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    /// The request body could not be read as the expected JSON.
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// An upload was rejected before reaching storage.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    // ── Storage errors ───────────────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ── Config errors ────────────────────────────────────────────────────
    /// No API credential is configured for the LLM provider.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── LLM errors ───────────────────────────────────────────────────────
    /// The request never reached the provider (DNS, TLS, connection reset).
    #[error("Network error calling LLM provider: {detail}")]
    Network { detail: String },

    /// The provider answered with an error status or an unusable payload.
    #[error("LLM API error (HTTP {status}): {message}")]
    Provider {
        status: u16,
        message: String,
        body: String,
    },

    /// The model output did not contain the expected number of answers.
    #[error("Invalid LLM response format: expected {expected} yes/no answers, found {found}")]
    AnalysisFormat { expected: usize, found: usize },

    // ── Catch-all ────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzeError {
    /// Stable machine-readable code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzeError::MissingFields { .. }
            | AnalyzeError::InvalidRequest(_)
            | AnalyzeError::InvalidUpload(_) => "VALIDATION_ERROR",
            AnalyzeError::Storage(_) => "STORAGE_ERROR",
            AnalyzeError::ProviderNotConfigured { .. } | AnalyzeError::InvalidConfig(_) => {
                "CONFIGURATION_ERROR"
            }
            AnalyzeError::Network { .. } => "NETWORK_ERROR",
            AnalyzeError::Provider { .. } => "PROVIDER_ERROR",
            AnalyzeError::AnalysisFormat { .. } => "ANALYSIS_FORMAT_ERROR",
            AnalyzeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Tag this error with the stage it escaped from.
    pub fn at(self, stage: Stage) -> StageError {
        StageError { stage, error: self }
    }
}

/// Request-handling stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request accepted; fields being validated.
    Received,
    /// Fetching the PDF from storage and extracting its text.
    Extracting,
    /// Prompting the LLM and interpreting its answer.
    Analyzing,
    /// Serialising the result.
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Extracting => "extracting",
            Stage::Analyzing => "analyzing",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// An [`AnalyzeError`] together with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: AnalyzeError,
}
