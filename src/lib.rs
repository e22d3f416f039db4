//! # marketmetric
//!
//! Analyse PDF market-research reports with a hosted chat-completion LLM.
//!
//! A report is uploaded to storage, its text is extracted, and a single
//! prompt asks the model for either a ten-point yes/no **scorecard** or a
//! five-section markdown **summary**. The answer comes back as JSON together
//! with a provenance record saying whether any stage had to substitute
//! canned data.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Storage   fetch bytes by path (skipped in local fallback mode)
//!  ├─ 2. Extract   pdf-extract under spawn_blocking; sample report on failure
//!  ├─ 3. Prompt    truncate (scorecard) or keyword-filter (summary)
//!  ├─ 4. LLM       one chat-completion call to Groq / any OpenAI-compatible API
//!  └─ 5. Interpret count numbered yes/no answers, or clean the markdown
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketmetric::{AnalysisConfig, AnalysisMode, Analyzer, GroqClient, LocalStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .mode(AnalysisMode::Scorecard)
//!         .api_key(std::env::var("GROQ_API_KEY")?)
//!         .build()?;
//!     let llm = Arc::new(GroqClient::new(&config)?);
//!     let storage = Arc::new(LocalStorage::new("./storage/market-reports"));
//!     let analyzer = Analyzer::new(config, storage, llm);
//!
//!     let outcome = analyzer.analyze_bytes(std::fs::read("report.pdf")?).await?;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `marketmetric` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! marketmetric = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{AnalyzeRequest, Analyzer};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, AnalysisMode, ParsePolicy};
pub use error::{AnalyzeError, Stage, StageError, StorageError};
pub use pipeline::extract::{ExtractedText, FallbackReason};
pub use pipeline::llm::{ChatCompletion, Completion, CompletionSource, GroqClient, LlmRequest};
pub use report::{
    AnalysisOutcome, Criterion, Provenance, ReportResults, Scorecard, Summary, TextSource,
    UploadedFile,
};
pub use server::{router, AppState};
pub use storage::{LocalStorage, Storage};
