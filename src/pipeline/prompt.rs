//! Prompt construction: bound the report text and wrap it in a request.
//!
//! Scorecard mode only needs the opening of a report (title page, executive
//! summary), so it keeps the first 8,000 characters. Summary mode needs
//! material from the whole document, so it first keeps the paragraphs that
//! look like market-report sections and only then truncates.

use crate::config::{AnalysisConfig, AnalysisMode};
use crate::pipeline::llm::LlmRequest;
use crate::prompts::{
    scorecard_prompt, summary_prompt, CANNED_SCORECARD_RESPONSE, CANNED_SUMMARY_RESPONSE,
    SCORECARD_SYSTEM_PROMPT, SECTION_KEYWORDS, SUMMARY_SYSTEM_PROMPT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Characters of report text sent in scorecard mode.
pub const SCORECARD_TEXT_LIMIT: usize = 8_000;

/// Characters kept by the relevance filter.
pub const FILTERED_TEXT_LIMIT: usize = 50_000;

/// Characters of filtered text sent in summary mode.
pub const SUMMARY_TEXT_LIMIT: usize = 40_000;

/// Below this many keyword matches the filter also keeps the document edges.
const MIN_MATCHED_PARAGRAPHS: usize = 20;

/// Paragraphs kept from each end of the document when matches are scarce.
const EDGE_PARAGRAPHS: usize = 10;

/// Build the LLM request for the configured mode.
pub fn build_request(report_text: &str, config: &AnalysisConfig) -> LlmRequest {
    match config.mode {
        AnalysisMode::Scorecard => build_scorecard_request(report_text, config),
        AnalysisMode::Summary => build_summary_request(report_text, config),
    }
}

/// Scorecard request: first 8,000 characters plus the ten questions.
pub fn build_scorecard_request(report_text: &str, config: &AnalysisConfig) -> LlmRequest {
    let text = truncate_chars(report_text, SCORECARD_TEXT_LIMIT);
    debug!("Scorecard prompt built from {} chars", text.chars().count());
    LlmRequest {
        system: SCORECARD_SYSTEM_PROMPT.to_string(),
        prompt: scorecard_prompt(text),
        max_tokens: config.max_tokens(),
        temperature: config.temperature(),
        canned_response: CANNED_SCORECARD_RESPONSE,
    }
}

/// Summary request: relevance-filtered text plus the five-section template.
pub fn build_summary_request(report_text: &str, config: &AnalysisConfig) -> LlmRequest {
    let filtered = filter_relevant(report_text);
    let text = truncate_chars(&filtered, SUMMARY_TEXT_LIMIT);
    debug!(
        "Summary prompt built from {} chars ({} before filtering)",
        text.chars().count(),
        report_text.chars().count()
    );
    LlmRequest {
        system: SUMMARY_SYSTEM_PROMPT.to_string(),
        prompt: summary_prompt(text),
        max_tokens: config.max_tokens(),
        temperature: config.temperature(),
        canned_response: CANNED_SUMMARY_RESPONSE,
    }
}

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Keep the paragraphs that mention a section keyword.
///
/// Paragraphs are blank-line delimited. When fewer than 20 match, the first
/// and last 10 paragraphs are kept too. Survivors keep their original order,
/// are joined by blank lines and capped at [`FILTERED_TEXT_LIMIT`].
pub fn filter_relevant(text: &str) -> String {
    let normalised = text.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = RE_PARAGRAPH_BREAK
        .split(&normalised)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut keep: Vec<bool> = paragraphs.iter().map(|p| is_relevant(p)).collect();
    let matched = keep.iter().filter(|&&k| k).count();

    if matched < MIN_MATCHED_PARAGRAPHS {
        let n = paragraphs.len();
        for i in (0..n.min(EDGE_PARAGRAPHS)).chain(n.saturating_sub(EDGE_PARAGRAPHS)..n) {
            keep[i] = true;
        }
    }

    let joined = paragraphs
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(p, _)| *p)
        .collect::<Vec<_>>()
        .join("\n\n");

    debug!(
        "Relevance filter: {}/{} paragraphs matched keywords",
        matched,
        paragraphs.len()
    );
    truncate_chars(&joined, FILTERED_TEXT_LIMIT).to_string()
}

fn is_relevant(paragraph: &str) -> bool {
    let lower = paragraph.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// The first `max_chars` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn scorecard_config() -> AnalysisConfig {
        AnalysisConfig::builder()
            .mode(AnalysisMode::Scorecard)
            .build()
            .unwrap()
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("€€€", 0), "");
    }

    #[test]
    fn scorecard_request_caps_text() {
        let long = "x".repeat(20_000);
        let req = build_scorecard_request(&long, &scorecard_config());
        assert!(req.prompt.contains(&"x".repeat(SCORECARD_TEXT_LIMIT)));
        assert!(!req.prompt.contains(&"x".repeat(SCORECARD_TEXT_LIMIT + 1)));
        assert_eq!(req.max_tokens, 300);
        assert_eq!(req.canned_response, CANNED_SCORECARD_RESPONSE);
    }

    #[test]
    fn build_request_follows_mode() {
        let summary = build_request("text", &AnalysisConfig::default());
        assert_eq!(summary.canned_response, CANNED_SUMMARY_RESPONSE);
        assert!(summary.prompt.contains("EXECUTIVE SUMMARY"));

        let scorecard = build_request("text", &scorecard_config());
        assert!(scorecard.prompt.contains("10. Does the report identify regulatory"));
    }

    #[test]
    fn filter_keeps_keyword_paragraphs_in_order() {
        let mut paras: Vec<String> = (0..30).map(|i| format!("filler paragraph {i}")).collect();
        paras[15] = "The market grows at a CAGR of 12%.".into();
        paras[20] = "Competitive Landscape: three vendors dominate.".into();
        let text = paras.join("\n\n");

        let out = filter_relevant(&text);
        let cagr = out.find("CAGR").unwrap();
        let comp = out.find("Competitive Landscape").unwrap();
        assert!(cagr < comp);
        // Fewer than 20 matches: edges kept as well.
        assert!(out.starts_with("filler paragraph 0"));
        assert!(out.ends_with("filler paragraph 29"));
        // Middle filler outside the edges is dropped.
        assert!(!out.contains("filler paragraph 12"));
    }

    #[test]
    fn filter_skips_edges_when_enough_matches() {
        let mut paras = vec!["cover page".to_string()];
        paras.extend((0..25).map(|i| format!("segment {i} revenue")));
        paras.push("back cover".into());
        let out = filter_relevant(&paras.join("\n\n"));
        assert!(!out.contains("cover page"));
        assert!(!out.contains("back cover"));
        assert!(out.contains("segment 24 revenue"));
    }

    #[test]
    fn filter_does_not_duplicate_overlapping_edges() {
        let text = (0..5)
            .map(|i| format!("para {i}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let out = filter_relevant(&text);
        assert_eq!(out.matches("para 2").count(), 1);
        assert_eq!(out, text);
    }

    #[test]
    fn filter_caps_output_length() {
        let para = format!("{} cagr", "a".repeat(999));
        let text = vec![para; 80].join("\n\n");
        assert!(filter_relevant(&text).chars().count() <= FILTERED_TEXT_LIMIT);
    }
}
