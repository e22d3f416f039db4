//! Request orchestration: validate, extract, prompt, interpret.
//!
//! [`Analyzer::analyze`] walks one request through the stages
//! `Received → Extracting → Analyzing`; the HTTP layer owns `Responding`.
//! Every error leaves tagged with the stage it escaped from, so a missing
//! storage object and a provider outage are reported differently even though
//! both stop the request.

use crate::config::{AnalysisConfig, AnalysisMode};
use crate::error::{AnalyzeError, Stage, StageError};
use crate::pipeline::extract::{self, ExtractedText};
use crate::pipeline::llm::{ChatCompletion, Completion};
use crate::pipeline::{postprocess, prompt, scorecard};
use crate::report::{
    AnalysisOutcome, Provenance, ReportResults, Summary, TextSource, UploadedFile,
};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Body of `POST /analyze`.
///
/// Fields are optional at the type level so a missing field becomes a
/// validation error with a useful message rather than a JSON rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    /// Only logged.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            file_name: Some(file_name.into()),
            user_id: None,
        }
    }

    /// Check that `filePath` and `fileName` are present and non-blank.
    pub fn validate(&self) -> Result<UploadedFile, AnalyzeError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        match (present(&self.file_path), present(&self.file_name)) {
            (Some(path), Some(name)) => Ok(UploadedFile {
                path: path.to_string(),
                name: name.to_string(),
            }),
            (path, name) => {
                let mut fields = Vec::new();
                if path.is_none() {
                    fields.push("filePath");
                }
                if name.is_none() {
                    fields.push("fileName");
                }
                Err(AnalyzeError::MissingFields { fields })
            }
        }
    }
}

/// The analysis pipeline with its collaborators.
///
/// Built once at startup and shared behind an `Arc`; holds no mutable state.
#[derive(Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    storage: Arc<dyn Storage>,
    llm: Arc<dyn ChatCompletion>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("model", &self.llm.model())
            .finish()
    }
}

impl Analyzer {
    pub fn new(
        config: AnalysisConfig,
        storage: Arc<dyn Storage>,
        llm: Arc<dyn ChatCompletion>,
    ) -> Self {
        Self {
            config,
            storage,
            llm,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Analyse a stored report.
    ///
    /// In local fallback mode the storage download is skipped and the sample
    /// report is analysed.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisOutcome, StageError> {
        let start = Instant::now();

        // ── Stage: Received ──────────────────────────────────────────────
        let file = request.validate().map_err(|e| fail(e, Stage::Received))?;
        info!(
            "Analysis requested for '{}' at {} (user: {})",
            file.name,
            file.path,
            request.user_id.as_deref().unwrap_or("anonymous")
        );

        // ── Stage: Extracting ────────────────────────────────────────────
        let bytes = if self.config.use_local_fallback {
            Vec::new()
        } else {
            self.storage
                .download(&file.path)
                .await
                .map_err(|e| fail(e.into(), Stage::Extracting))?
        };
        let text =
            extract::extract(bytes, self.config.use_local_fallback, self.extract_timeout()).await;

        // ── Stage: Analyzing ─────────────────────────────────────────────
        let outcome = self
            .run_model(&text)
            .await
            .map_err(|e| fail(e, Stage::Analyzing))?;

        info!(
            "Analysis of '{}' complete in {:?} (degraded: {})",
            file.name,
            start.elapsed(),
            outcome.provenance.is_degraded()
        );
        Ok(outcome)
    }

    /// Analyse PDF bytes directly, bypassing storage.
    pub async fn analyze_bytes(&self, bytes: Vec<u8>) -> Result<AnalysisOutcome, StageError> {
        let text =
            extract::extract(bytes, self.config.use_local_fallback, self.extract_timeout()).await;
        self.run_model(&text)
            .await
            .map_err(|e| fail(e, Stage::Analyzing))
    }

    fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.config.extract_timeout_secs)
    }

    async fn run_model(&self, text: &ExtractedText) -> Result<AnalysisOutcome, AnalyzeError> {
        let request = prompt::build_request(text.text(), &self.config);
        debug!(
            "Calling {} in {} mode ({} prompt chars)",
            self.llm.model(),
            self.config.mode,
            request.prompt.len()
        );
        let completion = self.llm.complete(&request).await?;
        interpret(completion, text, &self.config)
    }
}

/// Turn a completion into results for the configured mode.
pub fn interpret(
    completion: Completion,
    text: &ExtractedText,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome, AnalyzeError> {
    let (results, answers_found) = match config.mode {
        AnalysisMode::Scorecard => {
            let (card, found) = scorecard::parse_scorecard(&completion.text, config.parse_policy)?;
            (ReportResults::Scorecard(card), Some(found))
        }
        AnalysisMode::Summary => {
            if completion.text.trim().is_empty() {
                warn!("Model returned an empty summary");
            }
            let summary = postprocess::clean_summary(&completion.text);
            (ReportResults::Summary(Summary { summary }), None)
        }
    };

    let provenance = Provenance {
        text: if text.is_fallback() {
            TextSource::Fallback
        } else {
            TextSource::Extracted
        },
        fallback_reason: text.fallback_reason(),
        completion: completion.source,
        answers_found,
    };
    Ok(AnalysisOutcome {
        results,
        provenance,
    })
}

fn fail(error: AnalyzeError, stage: Stage) -> StageError {
    error!("Analysis failed at stage {}: {}", stage, error);
    error.at(stage)
}
