//! Configuration types for report analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. The binary maps CLI flags and environment
//! variables onto the builder once at startup; the resulting config is then
//! shared read-only by every request.

use crate::error::AnalyzeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default chat-completions base URL (OpenAI-compatible Groq endpoint).
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

/// Hard upper bound on PDF parsing time.
pub const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 30;

/// Configuration for report analysis.
///
/// # Example
/// ```rust
/// use marketmetric::{AnalysisConfig, AnalysisMode, ParsePolicy};
///
/// let config = AnalysisConfig::builder()
///     .mode(AnalysisMode::Scorecard)
///     .parse_policy(ParsePolicy::Strict)
///     .api_key("gsk_test")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens(), 300);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Which analysis the endpoint produces. Default: [`AnalysisMode::Summary`].
    pub mode: AnalysisMode,

    /// What to do when the scorecard answer count is not 10. Default: lenient.
    pub parse_policy: ParsePolicy,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Base URL of the OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,

    /// Bearer credential. `None` means the gateway cannot be constructed.
    pub api_key: Option<String>,

    /// Completion token budget. `None` uses the mode default (300 / 4096).
    pub max_tokens: Option<u32>,

    /// Sampling temperature. `None` uses the mode default (0.1 / 0.2).
    pub temperature: Option<f32>,

    /// Analyse the built-in sample report instead of the uploaded file.
    ///
    /// Intended for local testing without storage; the storage download is
    /// skipped entirely.
    pub use_local_fallback: bool,

    /// Hard timeout for PDF text extraction in seconds. Default: 30.
    pub extract_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            parse_policy: ParsePolicy::default(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            use_local_fallback: false,
            extract_timeout_secs: DEFAULT_EXTRACT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("mode", &self.mode)
            .field("parse_policy", &self.parse_policy)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("use_local_fallback", &self.use_local_fallback)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective completion token budget for the configured mode.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(match self.mode {
            AnalysisMode::Scorecard => 300,
            AnalysisMode::Summary => 4096,
        })
    }

    /// Effective sampling temperature for the configured mode.
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(match self.mode {
            AnalysisMode::Scorecard => 0.1,
            AnalysisMode::Summary => 0.2,
        })
    }

    /// Full chat-completions endpoint URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.config.parse_policy = policy;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn use_local_fallback(mut self, v: bool) -> Self {
        self.config.use_local_fallback = v;
        self
    }

    pub fn extract_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extract_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyzeError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalyzeError::InvalidConfig("Model must not be empty".into()));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(AnalyzeError::InvalidConfig(format!(
                "Base URL must be an HTTP/HTTPS URL, got '{}'",
                c.base_url
            )));
        }
        if c.max_tokens == Some(0) {
            return Err(AnalyzeError::InvalidConfig(
                "Max tokens must be ≥ 1".into(),
            ));
        }
        if c.extract_timeout_secs == 0 {
            return Err(AnalyzeError::InvalidConfig(
                "Extraction timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The two analyses the `/analyze` endpoint can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Ten yes/no criteria and a 0–10 score.
    Scorecard,
    /// Five-section markdown narrative. (default)
    #[default]
    Summary,
}

impl FromStr for AnalysisMode {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scorecard" | "score" => Ok(AnalysisMode::Scorecard),
            "summary" => Ok(AnalysisMode::Summary),
            other => Err(AnalyzeError::InvalidConfig(format!(
                "Unknown analysis mode '{other}' (expected scorecard or summary)"
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Scorecard => f.write_str("scorecard"),
            AnalysisMode::Summary => f.write_str("summary"),
        }
    }
}

/// How strictly the scorecard parser treats the number of numbered answers.
///
/// | Policy | Fewer than 10 | More than 10 |
/// |--------|---------------|--------------|
/// | `Strict` | error | error |
/// | `Lenient` | padded with `false` | extra answers ignored |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    Strict,
    /// (default)
    #[default]
    Lenient,
}

impl FromStr for ParsePolicy {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ParsePolicy::Strict),
            "lenient" => Ok(ParsePolicy::Lenient),
            other => Err(AnalyzeError::InvalidConfig(format!(
                "Unknown parse policy '{other}' (expected strict or lenient)"
            ))),
        }
    }
}
